// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Outline tests: entities and the declarations they point back to.

use querify_ast::decl::{DeclKind, MemberBody};
use querify_entities::{collect_entities, outline, outline_json, outline_text, EntityKind};
use querify_parser::parse_source;

const SOURCE: &str = "namespace Shop
{
    [Serializable]
    public class Cart
    {
        int count = 0, limit;
        public Cart (int limit) { }
        public int Count { get { return count; } private set { count = value; } }
        public int this [int i] => i;
        public static Cart operator + (Cart a, Cart b) => a;
        public event EventHandler Changed;
        event EventHandler Cleared { add { } remove { } }
        public void Add (string item) { }
        enum State { Empty, Full = 2 }
    }
}
";

fn kinds_and_names() -> Vec<(EntityKind, String)> {
    outline(SOURCE).iter().map(|e| (e.kind, e.full_name())).collect()
}

#[test]
fn lists_declarations_in_order() {
    assert_eq!(
        kinds_and_names(),
        vec![
            (EntityKind::Class, "Shop.Cart".to_string()),
            (EntityKind::Field, "Shop.Cart.count".to_string()),
            (EntityKind::Field, "Shop.Cart.limit".to_string()),
            (EntityKind::Constructor, "Shop.Cart.Cart".to_string()),
            (EntityKind::Property, "Shop.Cart.Count".to_string()),
            (EntityKind::Indexer, "Shop.Cart.Item".to_string()),
            (EntityKind::Operator, "Shop.Cart.op_Addition".to_string()),
            (EntityKind::Event, "Shop.Cart.Changed".to_string()),
            (EntityKind::CustomEvent, "Shop.Cart.Cleared".to_string()),
            (EntityKind::Method, "Shop.Cart.Add".to_string()),
            (EntityKind::Enum, "Shop.Cart.State".to_string()),
            (EntityKind::EnumMember, "Shop.Cart.State.Empty".to_string()),
            (EntityKind::EnumMember, "Shop.Cart.State.Full".to_string()),
        ]
    );
}

#[test]
fn fields_of_one_declaration_share_their_tag() {
    let entities = outline(SOURCE);
    assert_eq!(entities[1].decl, entities[2].decl);
    assert_eq!(entities[1].ty.as_deref(), Some("int"));
}

#[test]
fn accessors_are_tagged_with_their_nodes() {
    let parsed = parse_source(SOURCE);
    let entities = collect_entities(&parsed.tree);
    let property = &entities[4];
    let names: Vec<&str> = property.accessors.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["get_Count", "set_Count"]);
    assert_eq!(property.accessors[1].modifiers, vec!["private"]);
    assert_ne!(property.accessors[0].decl, property.decl);

    let DeclKind::Namespace(ns) = &parsed.tree.members[0].kind else {
        panic!("Expected namespace");
    };
    let DeclKind::Type(cart) = &ns.members[0].kind else {
        panic!("Expected class");
    };
    let DeclKind::Property(prop) = &cart.members[2].kind else {
        panic!("Expected property");
    };
    assert_eq!(property.accessors[0].decl.id, prop.accessors[0].id);
    assert!(matches!(prop.accessors[0].body, Some(MemberBody::Block(_))));

    let event = &entities[8];
    let names: Vec<&str> = event.accessors.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["add_Cleared", "remove_Cleared"]);
}

#[test]
fn attributes_are_entities() {
    let entities = outline(SOURCE);
    let class = &entities[0];
    assert_eq!(class.attributes.len(), 1);
    assert_eq!(class.attributes[0].kind, EntityKind::Attribute);
    assert_eq!(class.attributes[0].name, "Serializable");
    assert_eq!(class.attributes[0].decl.span.text(SOURCE), Some("Serializable"));
}

#[test]
fn json_output() {
    let json = outline_json(&outline("class C { int x; }"));
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value[0]["kind"], "class");
    assert_eq!(value[1]["kind"], "field");
    assert_eq!(value[1]["type"], "int");
    assert_eq!(value[1]["parent"], "C");
    assert!(value[1]["decl"]["span"]["start"].is_u64());
}

#[test]
fn text_output() {
    let source = "class C\n{\n    void M (int a) { }\n}";
    let text = outline_text(&outline(source), source);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].trim_start().starts_with("1:1"));
    assert!(lines[1].ends_with("method C.M (int a): void"));
}
