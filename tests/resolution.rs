//! Library-level resolution scenarios.

use std::sync::Arc;

use footprints::collector::{AccessError, Declaration, Registry};
use footprints::core::{description, AttributeDelta, Context, Description, Fragment, OnlyFilter, Value};
use footprints::resolver::{Rejection, Resolution};

fn apple() -> Declaration {
    Declaration::new("apple").tag("fruit").fragment(
        Fragment::new()
            .attr("colour", AttributeDelta::new().values(["red", "yellow", "green"]))
            .attr("producer", AttributeDelta::new().default_value("Jacques")),
    )
}

fn registry_with(decls: impl IntoIterator<Item = Declaration>) -> Registry {
    let registry = Registry::new();
    for decl in decls {
        registry.declare(decl).unwrap();
    }
    registry
}

fn winner(resolution: &Resolution) -> Option<&str> {
    resolution.winner().map(|w| w.candidate.as_str())
}

fn rejections<'a>(resolution: &'a Resolution, candidate: &str) -> Vec<&'a Rejection> {
    resolution
        .rejected()
        .iter()
        .filter(|c| c.candidate == candidate)
        .flat_map(|c| c.attributes.iter().map(|f| &f.reason).chain(c.only.iter().map(|o| &o.reason)))
        .collect()
}

// ============================================================================
// Ranking
// ============================================================================

#[test]
fn test_resolution_is_deterministic() {
    let registry = registry_with([
        apple(),
        Declaration::new("pear")
            .tag("fruit")
            .fragment(Fragment::new().attr("colour", AttributeDelta::new().values(["green"]))),
        Declaration::new("quince")
            .tag("fruit")
            .fragment(Fragment::new().attr("colour", AttributeDelta::new())),
    ]);
    let desc = description([("colour", "green"), ("weight", "3")]);
    let ctx = Context::new();

    let first = registry.resolve("fruit", &desc, &ctx).report("fruit", &desc);
    for _ in 0..5 {
        let again = registry.resolve("fruit", &desc, &ctx).report("fruit", &desc);
        assert_eq!(first, again);
    }
    let order: Vec<_> = first.ranked.iter().map(|r| r.candidate.as_str()).collect();
    assert_eq!(order, vec!["apple", "pear", "quince"]);
}

#[test]
fn test_priority_dominates_attribute_count() {
    let registry = registry_with([
        Declaration::new("detailed").tag("tool").fragment(
            Fragment::new()
                .attr("a", AttributeDelta::new())
                .attr("b", AttributeDelta::new())
                .attr("c", AttributeDelta::new()),
        ),
        Declaration::new("debugger")
            .tag("tool")
            .fragment(Fragment::new().attr("a", AttributeDelta::new()).priority("debug")),
    ]);
    let desc = description([("a", "1"), ("b", "2"), ("c", "3")]);
    let resolution = registry.resolve("tool", &desc, &Context::new());
    assert_eq!(winner(&resolution), Some("debugger"));
    assert_eq!(resolution.ranked()[1].score, 3);
    assert!(!resolution.is_ambiguous());
}

#[test]
fn test_alias_selects_candidate() {
    let registry = registry_with([
        Declaration::new("plain")
            .tag("fruit")
            .fragment(Fragment::new().attr("colour", AttributeDelta::new())),
        Declaration::new("aliased")
            .tag("fruit")
            .fragment(Fragment::new().attr("colour", AttributeDelta::new().alias("aspect"))),
    ]);
    let desc = description([("aspect", "red")]);
    let resolution = registry.resolve("fruit", &desc, &Context::new());
    assert_eq!(winner(&resolution), Some("aliased"));
    assert_eq!(rejections(&resolution, "plain"), vec![&Rejection::MissingValue]);

    let object = registry.load("fruit", &desc, &Context::new()).unwrap();
    assert_eq!(object.get("colour").unwrap(), Some(Value::from("red")));
    assert_eq!(
        object.get("aspect"),
        Err(AccessError::UnknownAttribute("aspect".to_string()))
    );
}

#[test]
fn test_alias_outscores_equal_candidate() {
    let registry = registry_with([
        Declaration::new("plain")
            .tag("fruit")
            .explicit(false)
            .fragment(Fragment::new().attr("colour", AttributeDelta::new().optional())),
        Declaration::new("aliased")
            .tag("fruit")
            .fragment(Fragment::new().attr("colour", AttributeDelta::new().alias("aspect"))),
    ]);
    let resolution = registry.resolve("fruit", &description([("aspect", "red")]), &Context::new());
    assert_eq!(winner(&resolution), Some("aliased"));

    let ranked = resolution.ranked();
    assert_eq!(ranked.len(), 2);
    assert_eq!((ranked[0].score, ranked[1].score), (1, 0));
    assert_eq!(ranked[1].candidate, "plain");
    assert!(!resolution.is_ambiguous());
}

// ============================================================================
// Binding
// ============================================================================

#[test]
fn test_coerce_then_remap_then_check() {
    let registry = registry_with([Declaration::new("sized").tag("box").fragment(
        Fragment::new().attr(
            "size",
            AttributeDelta::new()
                .kind("integer")
                .values([1, 2, 3])
                .remap(7, 3)
                .remap(1, 9),
        ),
    )]);
    let ctx = Context::new();

    let resolution = registry.resolve("box", &description([("size", "7")]), &ctx);
    assert_eq!(winner(&resolution), Some("sized"));
    assert_eq!(resolution.winner().unwrap().bound["size"], Value::Integer(3));

    let resolution = registry.resolve("box", &description([("size", "1")]), &ctx);
    assert!(matches!(
        rejections(&resolution, "sized")[..],
        [Rejection::NotInValues { value, .. }] if value == "9"
    ));

    let resolution = registry.resolve("box", &description([("size", "big")]), &ctx);
    assert!(matches!(
        rejections(&resolution, "sized")[..],
        [Rejection::CoercionFailure { .. }]
    ));
}

#[test]
fn test_outcast_checked_after_remap() {
    let registry = registry_with([Declaration::new("cider").tag("drink").fragment(
        Fragment::new().attr(
            "origin",
            AttributeDelta::new()
                .outcast(["Scotland", "Ireland"])
                .remap("Eire", "Irlanda")
                .remap("Caledonia", "Scotland"),
        ),
    )]);
    let ctx = Context::new();
    let origin = |v: &str| registry.resolve("drink", &description([("origin", v)]), &ctx);

    let scotland = origin("Scotland");
    assert_eq!(
        rejections(&scotland, "cider"),
        vec![&Rejection::OutcastValue {
            value: "Scotland".to_string()
        }]
    );
    assert!(origin("Normandy").is_match());
    assert!(origin("Eire").is_match());
    assert!(!origin("Caledonia").is_match());
}

#[test]
fn test_absent_optional_takes_default() {
    let registry = registry_with([apple()]);
    let resolution = registry.resolve("fruit", &description([("colour", "red")]), &Context::new());
    let bound = &resolution.winner().unwrap().bound;
    assert_eq!(bound["producer"], Value::from("Jacques"));
    assert_eq!(resolution.winner().unwrap().score, 1);
}

// ============================================================================
// Registration
// ============================================================================

#[test]
fn test_explicit_footprint_needs_mandatory_attribute() {
    let registry = Registry::new();
    let defaults_only = || {
        Declaration::new("defaults")
            .tag("fruit")
            .fragment(Fragment::new().attr("producer", AttributeDelta::new().default_value("Jacques")))
    };
    assert!(registry.declare(defaults_only()).is_err());
    assert!(registry.entries("fruit").is_empty());

    registry.declare(defaults_only().explicit(false)).unwrap();
    let object = registry.load("fruit", &Description::new(), &Context::new()).unwrap();
    assert_eq!(object.implementation(), "defaults");
    assert_eq!(object.get("producer").unwrap(), Some(Value::from("Jacques")));
}

// ============================================================================
// Scoping
// ============================================================================

#[test]
fn test_only_rule_follows_context() {
    let registry = registry_with([
        apple(),
        Declaration::new("vintage").tag("fruit").fragment(
            Fragment::new()
                .attr("colour", AttributeDelta::new())
                .only("harvest", OnlyFilter::is_in([2001, 2007]))
                .priority("toolbox"),
        ),
    ]);
    let desc = description([("colour", "red")]);

    let late = registry.resolve("fruit", &desc, &description([("harvest", 2014)]));
    assert_eq!(winner(&late), Some("apple"));
    assert!(matches!(
        rejections(&late, "vintage")[..],
        [Rejection::OnlyFilterRejected { .. }]
    ));

    let missing = registry.resolve("fruit", &desc, &Context::new());
    assert!(matches!(
        rejections(&missing, "vintage")[..],
        [Rejection::OnlyMissingContext { .. }]
    ));

    let good = registry.resolve("fruit", &desc, &description([("harvest", 2007)]));
    assert_eq!(winner(&good), Some("vintage"));
}

// ============================================================================
// Instances
// ============================================================================

#[test]
fn test_reuse_or_create_hands_back_the_same_apple() {
    let registry = registry_with([apple()]);
    let ctx = Context::new();

    let first = registry
        .reuse_or_create("fruit", &description([("colour", "yellow")]), &ctx)
        .unwrap();
    let second = registry.reuse_or_create("fruit", &Description::new(), &ctx).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(registry.instances("fruit").len(), 1);
    assert_eq!(second.get("colour").unwrap(), Some(Value::from("yellow")));
}

#[test]
fn test_reuse_respects_values_and_reusable_flag() {
    let registry = registry_with([apple(), Declaration::new("pear").tag("pear").reusable(false).fragment(
        Fragment::new().attr("colour", AttributeDelta::new()),
    )]);
    let ctx = Context::new();

    let yellow = registry
        .reuse_or_create("fruit", &description([("colour", "yellow")]), &ctx)
        .unwrap();
    let red = registry
        .reuse_or_create("fruit", &description([("colour", "red")]), &ctx)
        .unwrap();
    assert!(!Arc::ptr_eq(&yellow, &red));
    assert_eq!(registry.instances("fruit").len(), 2);

    let desc = description([("colour", "green")]);
    let a = registry.reuse_or_create("pear", &desc, &ctx).unwrap();
    let b = registry.reuse_or_create("pear", &desc, &ctx).unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
}

#[test]
fn test_dropped_instances_leave_the_cache() {
    let registry = registry_with([apple()]);
    let ctx = Context::new();
    let object = registry
        .reuse_or_create("fruit", &description([("colour", "red")]), &ctx)
        .unwrap();
    assert_eq!(registry.instances("fruit").len(), 1);
    drop(object);
    assert!(registry.instances("fruit").is_empty());
}
