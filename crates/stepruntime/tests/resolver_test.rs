use serde_json::json;
use std::collections::HashMap;
use stepcore::Context;
use stepruntime::resolver::{resolve_parameters, resolve_string, resolve_value};

fn context(pairs: &[(&str, serde_json::Value)]) -> Context {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn plain_string_is_unchanged() {
    let ctx = context(&[("name", json!("alice"))]);
    assert_eq!(resolve_string("no placeholders here", &ctx), "no placeholders here");
}

#[test]
fn simple_substitution() {
    let ctx = context(&[("name", json!("alice"))]);
    assert_eq!(resolve_string("hello {{name}}", &ctx), "hello alice");
}

#[test]
fn dotted_path_traverses_nested_objects() {
    let ctx = context(&[(
        "response",
        json!({"data": {"value": "found"}}),
    )]);
    assert_eq!(resolve_string("{{response.data.value}}", &ctx), "found");
}

#[test]
fn numeric_segments_index_into_arrays() {
    let ctx = context(&[("results", json!([{"title": "first"}, {"title": "second"}]))]);
    assert_eq!(resolve_string("{{results.1.title}}", &ctx), "second");
}

#[test]
fn missing_path_preserves_token_verbatim() {
    let ctx = Context::new();
    assert_eq!(resolve_string("{{missing.path}}", &ctx), "{{missing.path}}");
}

#[test]
fn null_value_preserves_token() {
    let ctx = context(&[("gone", json!(null))]);
    assert_eq!(resolve_string("value: {{gone}}", &ctx), "value: {{gone}}");
}

#[test]
fn traversal_through_scalar_is_a_miss() {
    let ctx = context(&[("count", json!(3))]);
    assert_eq!(resolve_string("{{count.inner}}", &ctx), "{{count.inner}}");
}

#[test]
fn whole_string_placeholder_still_converts_to_string() {
    // A value pulled through {{x}} always arrives as a string, even when
    // the placeholder is the entire parameter.
    let ctx = context(&[("count", json!(42))]);
    assert_eq!(resolve_value(&json!("{{count}}"), &ctx), json!("42"));
}

#[test]
fn non_string_values_render_as_json_inside_strings() {
    let ctx = context(&[("flag", json!(true)), ("items", json!([1, 2]))]);
    assert_eq!(resolve_string("flag={{flag}} items={{items}}", &ctx), "flag=true items=[1,2]");
}

#[test]
fn multiple_placeholders_in_one_string() {
    let ctx = context(&[("a", json!("x")), ("b", json!("y"))]);
    assert_eq!(resolve_string("{{a}}-{{missing}}-{{b}}", &ctx), "x-{{missing}}-y");
}

#[test]
fn unterminated_placeholder_is_left_alone() {
    let ctx = context(&[("a", json!("x"))]);
    assert_eq!(resolve_string("oops {{a", &ctx), "oops {{a");
}

#[test]
fn resolution_recurses_through_maps_and_sequences() {
    let ctx = context(&[("user", json!({"name": "alice"}))]);
    let mut parameters = HashMap::new();
    parameters.insert(
        "body".to_string(),
        json!({
            "greeting": "hi {{user.name}}",
            "tags": ["{{user.name}}", "static"],
            "limit": 5
        }),
    );

    let resolved = resolve_parameters(&parameters, &ctx);

    assert_eq!(
        resolved.get("body"),
        Some(&json!({
            "greeting": "hi alice",
            "tags": ["alice", "static"],
            "limit": 5
        }))
    );
}

#[test]
fn non_string_scalars_pass_through_untouched() {
    let ctx = Context::new();
    assert_eq!(resolve_value(&json!(7), &ctx), json!(7));
    assert_eq!(resolve_value(&json!(null), &ctx), json!(null));
    assert_eq!(resolve_value(&json!(false), &ctx), json!(false));
}

#[test]
fn expression_whitespace_is_trimmed() {
    let ctx = context(&[("name", json!("alice"))]);
    assert_eq!(resolve_string("{{ name }}", &ctx), "alice");
}
