use std::fmt::Write;

use crate::{Scene, SceneEntry, SceneNodeData, SceneValue};

/// Serialize a [`Scene`] back to `.scn` text. Parsing the output yields an equal scene.
pub fn write_scene(scene: &Scene) -> String {
    let mut out = String::new();
    if let Some(root) = &scene.root {
        let _ = writeln!(out, "@root = {root}");
        out.push('\n');
    }
    for entry in &scene.nodes {
        write_entry(&mut out, entry);
        out.push('\n');
    }
    out
}

fn write_entry(out: &mut String, entry: &SceneEntry) {
    let _ = writeln!(out, "[{}]", entry.key);
    if let Some(parent) = &entry.parent {
        let _ = writeln!(out, "parent = {parent}");
    }
    if let Some(name) = &entry.name {
        let _ = writeln!(out, "name = {}", quote(name));
    }
    if let Some(script) = &entry.script {
        let _ = writeln!(out, "script = {}", quote(script));
    }
    if !entry.capabilities.is_empty() {
        let _ = writeln!(out, "capabilities = [{}]", entry.capabilities.join(", "));
    }
    write_data(out, &entry.data, 1);
    let _ = writeln!(out, "[/{}]", entry.key);
}

fn write_data(out: &mut String, data: &SceneNodeData, depth: usize) {
    let indent = "    ".repeat(depth.saturating_sub(1));
    let field_indent = "    ".repeat(depth);
    let _ = writeln!(out, "{indent}[{}]", data.ty);
    for (key, value) in &data.fields {
        let _ = writeln!(out, "{field_indent}{key} = {}", format_value(value));
    }
    if let Some(base) = &data.base {
        write_data(out, base, depth + 1);
    }
    let _ = writeln!(out, "{indent}[/{}]", data.ty);
}

pub fn format_value(value: &SceneValue) -> String {
    match value {
        SceneValue::Bool(b) => b.to_string(),
        SceneValue::F32(v) => v.to_string(),
        SceneValue::Vec2 { x, y } => format!("({x}, {y})"),
        SceneValue::Vec3 { x, y, z } => format!("({x}, {y}, {z})"),
        SceneValue::Vec4 { x, y, z, w } => format!("({x}, {y}, {z}, {w})"),
        SceneValue::Str(s) => quote(s),
        SceneValue::Key(k) => k.clone(),
        SceneValue::List(items) => {
            let parts: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", parts.join(", "))
        }
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
