use std::collections::HashMap;

use mold_structs::Quaternion;

use crate::{Lexer, Scene, SceneEntry, SceneError, SceneNodeData, SceneValue, Token};

pub struct Parser<'a> {
    src: &'a str,
    lexer: Lexer<'a>,
    current: Token,
    line: usize,
    vars: HashMap<String, SceneValue>,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a str) -> Result<Self, SceneError> {
        let mut lexer = Lexer::new(src);
        let current = lexer.next_token()?;
        let line = lexer.token_line();
        Ok(Self {
            src,
            lexer,
            current,
            line,
            vars: HashMap::new(),
        })
    }

    fn error(&self, message: impl Into<String>) -> SceneError {
        SceneError::new(self.line, message)
    }

    fn advance(&mut self) -> Result<(), SceneError> {
        self.current = self.lexer.next_token()?;
        self.line = self.lexer.token_line();
        Ok(())
    }

    fn expect(&mut self, t: Token) -> Result<(), SceneError> {
        if self.current != t {
            return Err(self.error(format!("expected {:?}, got {:?}", t, self.current)));
        }
        self.advance()
    }

    fn expect_ident(&mut self) -> Result<String, SceneError> {
        match std::mem::replace(&mut self.current, Token::Eof) {
            Token::Ident(s) => {
                self.advance()?;
                Ok(s)
            }
            other => Err(self.error(format!("expected identifier, got {:?}", other))),
        }
    }
}

impl<'a> Parser<'a> {
    /// First pass: gather `@name = value` declarations so later references resolve
    /// regardless of declaration order.
    fn collect_vars(mut self) -> Result<HashMap<String, SceneValue>, SceneError> {
        while self.current != Token::Eof {
            if self.current == Token::At {
                self.advance()?;
                let name = self.expect_ident()?;
                if self.current == Token::Equals {
                    self.advance()?;
                    if name == "root" {
                        let key = self.expect_ident()?;
                        self.vars.insert(name, SceneValue::Key(key));
                    } else if let Ok(value) = self.parse_value() {
                        self.vars.insert(name, value);
                    }
                }
                continue;
            }
            self.advance()?;
        }
        Ok(self.vars)
    }

    fn parse_value(&mut self) -> Result<SceneValue, SceneError> {
        match &self.current {
            Token::Number(n) => {
                let v = *n;
                self.advance()?;
                Ok(SceneValue::F32(v))
            }

            Token::String(s) => {
                let v = s.clone();
                self.advance()?;
                Ok(SceneValue::Str(v))
            }

            Token::At => {
                let line = self.line;
                self.advance()?;
                let name = self.expect_ident()?;
                self.vars
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| SceneError::new(line, format!("unknown variable @{name}")))
            }

            Token::Ident(name) => {
                let value = match name.as_str() {
                    "true" => SceneValue::Bool(true),
                    "false" => SceneValue::Bool(false),
                    _ => SceneValue::Key(name.clone()),
                };
                self.advance()?;
                Ok(value)
            }

            Token::LBracket => {
                self.advance()?;
                let mut items = Vec::new();
                while self.current != Token::RBracket {
                    items.push(self.parse_value()?);
                    if self.current == Token::Comma {
                        self.advance()?;
                    } else if self.current != Token::RBracket {
                        return Err(self.error(format!(
                            "expected `,` or `]` in list, got {:?}",
                            self.current
                        )));
                    }
                }
                self.expect(Token::RBracket)?;
                Ok(SceneValue::List(items))
            }

            Token::LParen => {
                self.advance()?;
                let mut nums = Vec::new();
                loop {
                    if let Token::Number(n) = self.current {
                        nums.push(n);
                        self.advance()?;
                    }
                    if self.current == Token::Comma {
                        self.advance()?;
                        continue;
                    }
                    break;
                }
                self.expect(Token::RParen)?;

                match nums.len() {
                    2 => Ok(SceneValue::Vec2 {
                        x: nums[0],
                        y: nums[1],
                    }),
                    3 => Ok(SceneValue::Vec3 {
                        x: nums[0],
                        y: nums[1],
                        z: nums[2],
                    }),
                    4 => Ok(SceneValue::Vec4 {
                        x: nums[0],
                        y: nums[1],
                        z: nums[2],
                        w: nums[3],
                    }),
                    n => Err(self.error(format!("invalid vector length {n}"))),
                }
            }

            other => Err(self.error(format!("invalid value token {:?}", other))),
        }
    }
}

/// `rotation_deg` (Euler degrees) and 3-component `rotation` (Euler radians) are
/// stored as a quaternion under `rotation`.
fn normalize_rotation(key: String, value: SceneValue) -> (String, SceneValue) {
    let quat = match (key.as_str(), &value) {
        ("rotation_deg", SceneValue::Vec3 { x, y, z }) => Quaternion::from_euler_degrees(*x, *y, *z),
        ("rotation", SceneValue::Vec3 { x, y, z }) => Quaternion::from_euler(*x, *y, *z),
        _ => return (key, value),
    };
    (
        "rotation".to_string(),
        SceneValue::Vec4 {
            x: quat.x,
            y: quat.y,
            z: quat.z,
            w: quat.w,
        },
    )
}

impl<'a> Parser<'a> {
    fn parse_type_block_after_lbracket(&mut self) -> Result<SceneNodeData, SceneError> {
        let ty = self.expect_ident()?;
        self.expect(Token::RBracket)?;

        let mut fields: Vec<(String, SceneValue)> = Vec::new();
        let mut base = None;

        loop {
            match &self.current {
                Token::LBracket => {
                    self.advance()?;
                    if self.current == Token::Slash {
                        self.advance()?;
                        let end = self.expect_ident()?;
                        if end != ty {
                            return Err(self.error(format!(
                                "mismatched closing block `[/{end}]`, expected `[/{ty}]`"
                            )));
                        }
                        self.expect(Token::RBracket)?;
                        break;
                    }
                    let nested = self.parse_type_block_after_lbracket()?;
                    base = Some(Box::new(nested));
                }

                Token::Ident(_) => {
                    let key = self.expect_ident()?;
                    self.expect(Token::Equals)?;
                    let val = self.parse_value()?;
                    let (key, val) = normalize_rotation(key, val);
                    match fields.iter_mut().find(|(k, _)| *k == key) {
                        Some(slot) => slot.1 = val,
                        None => fields.push((key, val)),
                    }
                }

                Token::Eof => return Err(self.error(format!("unterminated block `[{ty}]`"))),

                other => {
                    return Err(self.error(format!("unexpected {:?} in `[{ty}]`", other)));
                }
            }
        }

        Ok(SceneNodeData { ty, fields, base })
    }

    fn parse_node_block(&mut self) -> Result<SceneEntry, SceneError> {
        let key = self.expect_ident()?;
        self.expect(Token::RBracket)?;

        let mut entry = SceneEntry {
            key,
            ..SceneEntry::default()
        };

        while matches!(self.current, Token::Ident(_)) {
            let k = self.expect_ident()?;
            self.expect(Token::Equals)?;
            let v = self.parse_value()?;
            match (k.as_str(), v) {
                ("name", SceneValue::Str(s)) => entry.name = Some(s),
                ("parent", SceneValue::Key(p)) => entry.parent = Some(p),
                ("script", SceneValue::Str(s)) => entry.script = Some(s),
                ("capabilities", SceneValue::List(items)) => {
                    for item in items {
                        match item {
                            SceneValue::Key(s) | SceneValue::Str(s) => entry.capabilities.push(s),
                            other => {
                                return Err(self.error(format!(
                                    "capability must be an identifier, got {:?}",
                                    other
                                )));
                            }
                        }
                    }
                }
                ("name" | "parent" | "script" | "capabilities", other) => {
                    return Err(self.error(format!("invalid value for `{k}`: {:?}", other)));
                }
                _ => {}
            }
        }

        self.expect(Token::LBracket)?;
        if self.current != Token::Slash {
            entry.data = self.parse_type_block_after_lbracket()?;
            self.expect(Token::LBracket)?;
        }
        self.expect(Token::Slash)?;
        let end = self.expect_ident()?;
        if end != entry.key {
            return Err(self.error(format!(
                "mismatched closing block `[/{end}]`, expected `[/{}]`",
                entry.key
            )));
        }
        self.expect(Token::RBracket)?;
        Ok(entry)
    }

    fn parse_scene_inner(mut self) -> Result<Scene, SceneError> {
        let mut scene = Scene::default();

        while self.current != Token::Eof {
            match self.current {
                Token::At => {
                    self.advance()?;
                    let name = self.expect_ident()?;
                    self.expect(Token::Equals)?;

                    if name == "root" {
                        // root value must be a scene key (bare identifier)
                        let key = self.expect_ident()?;
                        scene.root = Some(key);
                    } else {
                        self.parse_value()?;
                    }
                }

                Token::LBracket => {
                    self.advance()?;
                    let entry = self.parse_node_block()?;
                    if scene.entry(&entry.key).is_some() {
                        return Err(self.error(format!("duplicate scene key `{}`", entry.key)));
                    }
                    scene.nodes.push(entry);
                }

                _ => {
                    return Err(self.error(format!("unexpected {:?} at top level", self.current)));
                }
            }
        }

        if let Some(root) = scene.root.as_deref() {
            if scene.entry(root).is_none() {
                return Err(SceneError::new(
                    self.line,
                    format!("scene root `{root}` not found in node list"),
                ));
            }
            if let Some(parent) = scene.entry(root).and_then(|e| e.parent.as_deref()) {
                return Err(SceneError::new(
                    self.line,
                    format!("scene root `{root}` cannot have a parent (`{parent}`)"),
                ));
            }
        }
        for entry in &scene.nodes {
            if let Some(parent) = entry.parent.as_deref() {
                if scene.entry(parent).is_none() {
                    return Err(SceneError::new(
                        self.line,
                        format!("parent `{parent}` of `{}` not found", entry.key),
                    ));
                }
            }
        }
        for entry in &scene.nodes {
            // a chain longer than the node list must revisit some key
            let mut cursor = entry.parent.as_deref();
            let mut steps = 0;
            while let Some(key) = cursor {
                if key == entry.key || steps > scene.nodes.len() {
                    return Err(SceneError::new(
                        self.line,
                        format!("parent cycle through `{}`", entry.key),
                    ));
                }
                steps += 1;
                cursor = scene.entry(key).and_then(|e| e.parent.as_deref());
            }
        }

        Ok(scene)
    }

    pub fn parse_scene(self) -> Result<Scene, SceneError> {
        let vars = Parser::new(self.src)?.collect_vars()?;
        let mut parser = Parser::new(self.src)?;
        parser.vars = vars;
        parser.parse_scene_inner()
    }
}

/// Parse a `.scn` source into a [`Scene`].
pub fn parse_scene(src: &str) -> Result<Scene, SceneError> {
    Parser::new(src)?.parse_scene()
}
