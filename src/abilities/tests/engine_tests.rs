//! Engine integration tests
//!
//! End-to-end checks through the public facade: grants and forbids,
//! wildcards, ownership, role levels, constraints, role management and
//! maintenance sweeps.

use cretoai_abilities::{
    constraints::Builder, AuthzEngine, AuthzError, Authority, Constraint, EngineConfig,
    GuardConfig, GuardSlot, HookGate, InMemoryStore, OwnershipRule, Record, RoleRef, Target,
    Verdict,
};
use std::sync::Arc;

fn engine() -> AuthzEngine {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    AuthzEngine::builder(Arc::new(InMemoryStore::new())).build()
}

fn uncached() -> AuthzEngine {
    AuthzEngine::builder(Arc::new(InMemoryStore::new()))
        .dont_cache()
        .build()
}

fn record(entity_type: &str, key: i64) -> Target {
    Target::from(Record::new(entity_type, key))
}

// ============================================================================
// BASIC GRANTS
// ============================================================================

#[test]
fn test_allow_then_forbid_specific_record() {
    let engine = engine();
    let p = Authority::new("user", 10);
    let u1 = record("user", 1);
    let u2 = record("user", 2);
    let post = record("post", 1);

    assert!(!engine.can(&p, "edit", Some(&u1)).unwrap());

    engine.allow(&p).to("edit", Target::of_type("user")).unwrap();
    engine.refresh_for(&p).unwrap();

    assert!(engine.can(&p, "edit", Some(&u1)).unwrap());
    assert!(engine.can(&p, "edit", Some(&u2)).unwrap());
    assert!(engine.cannot(&p, "edit", Some(&post)).unwrap());

    engine.forbid(&p).to("edit", u1.clone()).unwrap();
    engine.refresh_for(&p).unwrap();

    assert!(!engine.can(&p, "edit", Some(&u1)).unwrap());
    assert!(engine.can(&p, "edit", Some(&u2)).unwrap());
}

#[test]
fn test_simple_ability_does_not_cover_resources() {
    let engine = uncached();
    let user = Authority::new("user", 1);

    engine.allow(&user).to("ban-users", None).unwrap();

    assert!(engine.can(&user, "ban-users", None).unwrap());
    assert!(!engine.can(&user, "ban-users", Some(&record("user", 2))).unwrap());
}

#[test]
fn test_action_names_are_case_insensitive() {
    let engine = uncached();
    let user = Authority::new("user", 1);

    engine.allow(&user).to("Edit", Target::of_type("Post")).unwrap();

    assert!(engine.can(&user, "edit", Some(&record("post", 4))).unwrap());
    assert!(engine.can(&user, "EDIT", Some(&Target::of_type("post"))).unwrap());
}

#[test]
fn test_revoke_matches_grant_regardless_of_case() {
    let store = Arc::new(InMemoryStore::new());
    let engine = AuthzEngine::builder(store.clone()).dont_cache().build();
    let user = Authority::new("user", 1);

    engine.allow(&user).to("Edit", Target::of_type("Post")).unwrap();
    engine.allow(&user).to("edit", Target::of_type("post")).unwrap();
    assert_eq!(store.ability_count(), 1);
    assert_eq!(engine.abilities_for(&user).unwrap().len(), 1);

    assert_eq!(engine.disallow(&user).to("EDIT", Target::of_type("post")).unwrap(), 1);
    assert!(!engine.can(&user, "edit", Some(&record("post", 1))).unwrap());
}

#[test]
fn test_unforbid_restores_allow() {
    let engine = uncached();
    let user = Authority::new("user", 1);

    engine.allow(&user).to("edit", Target::of_type("post")).unwrap();
    engine.forbid(&user).to("edit", Target::of_type("post")).unwrap();
    assert!(!engine.can(&user, "edit", Some(&record("post", 1))).unwrap());

    engine.unforbid(&user).to("edit", Target::of_type("post")).unwrap();
    assert!(engine.can(&user, "edit", Some(&record("post", 1))).unwrap());
}

#[test]
fn test_check_get_id_tri_state() {
    let engine = uncached();
    let user = Authority::new("user", 1);

    assert_eq!(engine.check_get_id(&user, "view", None).unwrap(), Verdict::Undecided);

    engine.allow(&user).to("view", None).unwrap();
    let ability_id = engine.abilities_for(&user).unwrap()[0].id;
    assert_eq!(
        engine.check_get_id(&user, "view", None).unwrap(),
        Verdict::Allowed(ability_id)
    );

    engine.forbid(&user).to("view", None).unwrap();
    assert_eq!(engine.check_get_id(&user, "view", None).unwrap(), Verdict::Forbidden);
}

#[test]
fn test_unsaved_record_is_rejected() {
    let engine = uncached();
    let user = Authority::new("user", 1);

    let result = engine
        .allow(&user)
        .to("edit", Target::from(Record::unsaved("post")));

    assert!(matches!(result, Err(AuthzError::InvalidTarget(_))));
}

// ============================================================================
// WILDCARDS
// ============================================================================

#[test]
fn test_everything_subsumes_all_checks() {
    let engine = uncached();
    let user = Authority::new("user", 1);
    let checks = [
        ("delete", Some(record("post", 3))),
        ("archive", Some(Target::of_type("invoice"))),
        ("view", Some(Target::Everything)),
        ("reboot", None),
    ];

    engine.allow(&user).everything().unwrap();
    for (action, target) in &checks {
        assert!(engine.can(&user, action, target.as_ref()).unwrap(), "{}", action);
    }

    engine.disallow(&user).everything().unwrap();
    for (action, target) in &checks {
        assert!(!engine.can(&user, action, target.as_ref()).unwrap(), "{}", action);
    }
}

#[test]
fn test_to_manage_covers_every_action_on_type() {
    let engine = uncached();
    let user = Authority::new("user", 1);

    engine.allow(&user).to_manage(Target::of_type("post")).unwrap();

    assert!(engine.can(&user, "publish", Some(&record("post", 1))).unwrap());
    assert!(!engine.can(&user, "publish", Some(&record("page", 1))).unwrap());
}

#[test]
fn test_any_action_on_single_record() {
    let engine = uncached();
    let user = Authority::new("user", 1);

    engine.allow(&user).to_manage(record("post", 1)).unwrap();

    assert!(engine.can(&user, "delete", Some(&record("post", 1))).unwrap());
    assert!(!engine.can(&user, "delete", Some(&record("post", 2))).unwrap());
}

#[test]
fn test_forbid_everything_beats_specific_allow() {
    let engine = uncached();
    let user = Authority::new("user", 1);

    engine.allow(&user).to("edit", record("post", 1)).unwrap();
    engine.forbid(&user).everything().unwrap();

    assert!(!engine.can(&user, "edit", Some(&record("post", 1))).unwrap());
}

// ============================================================================
// OWNERSHIP
// ============================================================================

#[test]
fn test_owned_grant_follows_ownership() {
    let engine = uncached();
    let user = Authority::new("user", 1);
    let mine = Target::from(Record::new("post", 1).with_attribute("user_id", 1));
    let theirs = Target::from(Record::new("post", 2).with_attribute("user_id", 2));

    engine.allow(&user).to_own(Target::of_type("post")).to("edit").unwrap();

    assert!(engine.can(&user, "edit", Some(&mine)).unwrap());
    assert!(!engine.can(&user, "edit", Some(&theirs)).unwrap());
    assert!(!engine.can(&user, "delete", Some(&mine)).unwrap());
}

#[test]
fn test_registered_ownership_rules() {
    let engine = uncached();
    let user = Authority::new("user", 1);

    engine.owned_via("post", "author_id");
    engine.owned_via(
        "comment",
        OwnershipRule::predicate(|record, authority| {
            record.attribute("meta") == serde_json::json!({ "owner": authority.key })
        }),
    );
    engine.allow(&user).to_own_everything().unwrap();

    let post = Target::from(Record::new("post", 1).with_attribute("author_id", 1));
    let comment = Target::from(Record::new("comment", 1).with_attribute("meta", serde_json::json!({ "owner": 1 })));
    let heuristic = Target::from(Record::new("page", 1).with_attribute("user_id", 1));
    let foreign = Target::from(Record::new("post", 2).with_attribute("user_id", 1));

    assert!(engine.can(&user, "delete", Some(&post)).unwrap());
    assert!(engine.can(&user, "delete", Some(&comment)).unwrap());
    assert!(engine.can(&user, "delete", Some(&heuristic)).unwrap());
    assert!(!engine.can(&user, "delete", Some(&foreign)).unwrap());
}

#[test]
fn test_owned_forbid_applies_only_to_owned_records() {
    let engine = uncached();
    let user = Authority::new("user", 1);
    let mine = Target::from(Record::new("post", 1).with_attribute("user_id", 1));
    let theirs = Target::from(Record::new("post", 2).with_attribute("user_id", 2));

    engine.allow(&user).to("delete", Target::of_type("post")).unwrap();
    engine.forbid(&user).to_own(Target::of_type("post")).to("delete").unwrap();

    assert!(!engine.can(&user, "delete", Some(&mine)).unwrap());
    assert!(engine.can(&user, "delete", Some(&theirs)).unwrap());
}

// ============================================================================
// ROLES
// ============================================================================

#[test]
fn test_role_grants_reach_assigned_principals() {
    let engine = uncached();
    let user = Authority::new("user", 1);

    engine.allow("editor").to("edit", Target::of_type("post")).unwrap();
    engine.assign("editor").to(&user).unwrap();

    assert!(engine.can(&user, "edit", Some(&record("post", 1))).unwrap());
    assert!(engine.is(&user).a(&["editor", "admin"]).unwrap());
    assert!(!engine.is(&user).all(&["editor", "admin"]).unwrap());

    engine.retract("editor").from(&user).unwrap();
    assert!(!engine.can(&user, "edit", Some(&record("post", 1))).unwrap());
    assert!(engine.is(&user).not_a(&["editor"]).unwrap());
}

#[test]
fn test_role_level_inheritance() {
    let engine = uncached();
    let user = Authority::new("user", 1);

    engine.define_role("admin", Some(2)).unwrap();
    engine.define_role("editor", Some(1)).unwrap();
    engine.allow("editor").to("publish", None).unwrap();
    engine.assign("admin").to(&user).unwrap();

    assert!(engine.can(&user, "publish", None).unwrap());
    assert_eq!(engine.roles_for(&user).unwrap(), vec!["admin".to_string()]);
}

#[test]
fn test_lower_role_forbids_apply_to_higher_levels() {
    let engine = uncached();
    let user = Authority::new("user", 1);

    engine.define_role("admin", Some(2)).unwrap();
    engine.define_role("intern", Some(1)).unwrap();
    engine.allow("admin").to("deploy", None).unwrap();
    engine.forbid("intern").to("deploy", None).unwrap();
    engine.assign("admin").to(&user).unwrap();

    assert_eq!(engine.check_get_id(&user, "deploy", None).unwrap(), Verdict::Forbidden);
}

#[test]
fn test_equal_levels_do_not_inherit() {
    let engine = uncached();
    let user = Authority::new("user", 1);

    engine.define_role("admin", Some(1)).unwrap();
    engine.define_role("editor", Some(1)).unwrap();
    engine.allow("editor").to("publish", None).unwrap();
    engine.assign("admin").to(&user).unwrap();

    assert!(!engine.can(&user, "publish", None).unwrap());
}

#[test]
fn test_null_levels_do_not_inherit() {
    let engine = uncached();
    let user = Authority::new("user", 1);
    let other = Authority::new("user", 2);

    engine.define_role("admin", None).unwrap();
    engine.define_role("editor", Some(1)).unwrap();
    engine.allow("editor").to("publish", None).unwrap();
    engine.assign("admin").to(&user).unwrap();
    assert!(!engine.can(&user, "publish", None).unwrap());

    engine.define_role("owner", Some(5)).unwrap();
    engine.define_role("guest", None).unwrap();
    engine.allow("guest").to("comment", None).unwrap();
    engine.assign("owner").to(&other).unwrap();
    assert!(!engine.can(&other, "comment", None).unwrap());
}

#[test]
fn test_define_role_updates_level() {
    let engine = uncached();
    let user = Authority::new("user", 1);

    engine.assign("admin").to(&user).unwrap();
    engine.allow("editor").to("publish", None).unwrap();
    engine.define_role("editor", Some(1)).unwrap();
    assert!(!engine.can(&user, "publish", None).unwrap());

    let admin = engine.define_role("admin", Some(3)).unwrap();
    assert_eq!(admin.level, Some(3));
    assert!(engine.can(&user, "publish", None).unwrap());
}

#[test]
fn test_assign_unknown_role_id_fails() {
    let engine = uncached();
    let result = engine
        .assign(RoleRef::Id(404))
        .to(&Authority::new("user", 1));

    assert!(matches!(result, Err(AuthzError::InvalidIdentifier(_))));
}

#[test]
fn test_everyone_grants() {
    let engine = uncached();
    let alice = Authority::new("user", 1);
    let bob = Authority::new("user", 2);

    engine.allow_everyone().to("view", Target::of_type("post")).unwrap();
    engine.forbid(&bob).to("view", Target::of_type("post")).unwrap();

    assert!(engine.can(&alice, "view", Some(&record("post", 1))).unwrap());
    assert!(!engine.can(&bob, "view", Some(&record("post", 1))).unwrap());

    engine.forbid_everyone().to("view", record("post", 9)).unwrap();
    assert!(!engine.can(&alice, "view", Some(&record("post", 9))).unwrap());
}

// ============================================================================
// CONSTRAINTS
// ============================================================================

#[test]
fn test_constrained_grant() {
    let engine = uncached();
    let user = Authority::new("user", 1).with_attribute("team_id", 4);

    let constraints = Builder::new()
        .where_column("team_id", "=", "team_id")
        .unwrap()
        .where_("status", "!=", "archived")
        .unwrap()
        .build();

    engine
        .allow(&user)
        .with_constraints(constraints)
        .to("edit", Target::of_type("post"))
        .unwrap();

    let team_post = Target::from(
        Record::new("post", 1)
            .with_attribute("team_id", 4)
            .with_attribute("status", "draft"),
    );
    let archived = Target::from(
        Record::new("post", 2)
            .with_attribute("team_id", 4)
            .with_attribute("status", "archived"),
    );
    let other_team = Target::from(
        Record::new("post", 3)
            .with_attribute("team_id", 5)
            .with_attribute("status", "draft"),
    );

    assert!(engine.can(&user, "edit", Some(&team_post)).unwrap());
    assert!(!engine.can(&user, "edit", Some(&archived)).unwrap());
    assert!(!engine.can(&user, "edit", Some(&other_team)).unwrap());
    assert!(!engine.can(&user, "edit", Some(&Target::of_type("post"))).unwrap());
}

#[test]
fn test_constrained_grant_leaves_other_principals_unchanged() {
    let store = Arc::new(InMemoryStore::new());
    let engine = AuthzEngine::builder(store.clone()).dont_cache().build();
    let alice = Authority::new("user", 1);
    let bob = Authority::new("user", 2);
    let pricey = Target::from(Record::new("post", 1).with_attribute("price", 500));
    let cheap = Target::from(Record::new("post", 2).with_attribute("price", 5));

    engine.allow(&alice).to("edit", Target::of_type("post")).unwrap();
    assert!(engine.can(&alice, "edit", Some(&pricey)).unwrap());

    engine
        .allow(&bob)
        .with_constraints(Constraint::where_("price", "<", 10).unwrap())
        .to("edit", Target::of_type("post"))
        .unwrap();

    assert_eq!(store.ability_count(), 2);
    assert!(engine.can(&alice, "edit", Some(&pricey)).unwrap());
    assert!(!engine.can(&bob, "edit", Some(&pricey)).unwrap());
    assert!(engine.can(&bob, "edit", Some(&cheap)).unwrap());

    // An unconstrained grant after a constrained one gets its own row too
    let carol = Authority::new("user", 3);
    engine.allow(&carol).to("edit", Target::of_type("post")).unwrap();

    assert_eq!(store.ability_count(), 2);
    assert!(engine.can(&carol, "edit", Some(&pricey)).unwrap());
    assert!(!engine.can(&bob, "edit", Some(&pricey)).unwrap());
}

// ============================================================================
// SYNC, DELETION AND MAINTENANCE
// ============================================================================

#[test]
fn test_sync_abilities_and_roles() {
    let engine = uncached();
    let user = Authority::new("user", 1);

    engine.allow(&user).to(["view", "edit", "delete"], None).unwrap();
    engine.sync(&user).abilities(["view"], None).unwrap();
    engine.sync(&user).forbidden_abilities("ban", None).unwrap();

    assert!(engine.can(&user, "view", None).unwrap());
    assert!(!engine.can(&user, "edit", None).unwrap());
    assert_eq!(engine.forbidden_abilities_for(&user).unwrap().len(), 1);

    engine.sync(&user).roles(["admin", "editor"]).unwrap();
    engine.sync(&user).roles("editor").unwrap();
    assert_eq!(engine.roles_for(&user).unwrap(), vec!["editor".to_string()]);
}

#[test]
fn test_delete_authority_detaches_everything() {
    let engine = engine();
    let user = Authority::new("user", 1);

    engine.allow(&user).to("view", None).unwrap();
    engine.assign("editor").to(&user).unwrap();
    assert!(engine.can(&user, "view", None).unwrap());

    engine.delete_authority(&user).unwrap();

    assert!(!engine.can(&user, "view", None).unwrap());
    assert!(engine.roles_for(&user).unwrap().is_empty());
}

#[test]
fn test_delete_role() {
    let engine = uncached();
    let user = Authority::new("user", 1);

    engine.allow("editor").to("edit", None).unwrap();
    engine.assign("editor").to(&user).unwrap();

    assert!(engine.delete_role("editor").unwrap());
    assert!(!engine.delete_role("editor").unwrap());
    assert!(!engine.delete_role(RoleRef::Id(77)).unwrap());
    assert!(!engine.can(&user, "edit", None).unwrap());
}

#[test]
fn test_cleanup_sweeps() {
    let store = Arc::new(InMemoryStore::new());
    let engine = AuthzEngine::builder(store.clone()).dont_cache().build();
    let user = Authority::new("user", 1);

    engine.allow(&user).to("edit", record("post", 1)).unwrap();
    engine.allow(&user).to("edit", record("post", 2)).unwrap();
    engine.allow(&user).to("view", None).unwrap();
    engine.disallow(&user).to("view", None).unwrap();

    assert_eq!(engine.cleanup().unassigned_abilities().unwrap(), 1);
    assert_eq!(
        engine
            .cleanup()
            .orphaned_abilities(|_, key| key == 1)
            .unwrap(),
        1
    );
    assert_eq!(store.ability_count(), 1);
    assert!(engine.can(&user, "edit", Some(&record("post", 1))).unwrap());
}

// ============================================================================
// GATE
// ============================================================================

#[test]
fn test_engine_answers_gate_checks() {
    let config = EngineConfig {
        guard: GuardConfig { slot: GuardSlot::After },
        ..Default::default()
    };
    let engine = AuthzEngine::builder(Arc::new(InMemoryStore::new()))
        .config(config)
        .dont_cache()
        .build();
    let user = Authority::new("user", 1);

    engine.allow(&user).to(["view", "export"], None).unwrap();

    let mut gate = HookGate::new();
    gate.define("export", |_, _| false);
    engine.register_at(&mut gate);

    assert!(gate.allows(&user, "view", None).unwrap());
    assert!(gate.denies(&user, "export", None).unwrap());
    assert!(gate.denies(&user, "import", None).unwrap());
}
