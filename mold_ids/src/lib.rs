pub mod ids;

pub use ids::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_nil() {
        let nil = NodeID::nil();
        assert!(nil.is_nil());
        assert_eq!(nil.index(), 0);
        assert_eq!(nil.generation(), 0);
    }

    #[test]
    fn node_id_parts() {
        let id = NodeID::from_parts(5, 2);
        assert_eq!(id.index(), 5);
        assert_eq!(id.generation(), 2);
        assert!(!id.is_nil());
    }

    #[test]
    fn node_id_distinguishes_generations() {
        let a = NodeID::from_parts(3, 0);
        let b = NodeID::from_parts(3, 1);
        assert_ne!(a, b);
        assert_eq!(a.index(), b.index());
    }

    #[test]
    fn node_id_parse_display_form() {
        let id = NodeID::from_parts(12, 4);
        assert_eq!(NodeID::parse_str(&id.to_string()), Ok(id));
        assert_eq!(NodeID::parse_str("7"), Ok(NodeID::from_parts(7, 0)));
        assert!(NodeID::parse_str("x:1").is_err());
    }

    #[test]
    fn transaction_ids_increase() {
        let first = TransactionID::first();
        let second = first.next();
        assert!(second > first);
        assert_eq!(second.to_string(), "tx#2");
    }
}
