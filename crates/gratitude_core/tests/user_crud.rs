use gratitude_core::{
    open_db_in_memory, verify_password, Category, CategoryRepository, Page, Quote,
    QuoteRepository, RepoError, SqliteCategoryRepository, SqliteQuoteRepository,
    SqliteUserRepository, User, UserPatch, UserRepository, UserRole,
};

fn ana() -> User {
    User::new("Ana", "ana@x.com", UserRole::User)
}

#[test]
fn create_assigns_id_timestamp_and_hash() {
    let db = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::new(&db);

    let mut user = ana();
    let id = repo.create(&mut user, "secret1").unwrap();

    assert_eq!(user.id(), Some(id));
    assert!(user.created_at.is_some());
    assert_ne!(user.password_hash(), "secret1");
    assert!(verify_password("secret1", user.password_hash()));

    let loaded = repo.find_by_id(id).unwrap().unwrap();
    assert_eq!(loaded, user);
}

#[test]
fn duplicate_email_fails_and_first_user_remains() {
    let db = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::new(&db);

    let mut first = User::new("First", "a@b.com", UserRole::User);
    repo.create(&mut first, "secret1").unwrap();

    let mut second = User::new("Second", "a@b.com", UserRole::Admin);
    let err = repo.create(&mut second, "secret2").unwrap_err();
    assert!(matches!(
        err,
        RepoError::Duplicate {
            entity: "user",
            field: "email"
        }
    ));
    assert_eq!(second.id(), None);

    let found = repo.find_by_email("a@b.com").unwrap().unwrap();
    assert_eq!(found.name, "First");

    let mut shouting = User::new("Third", "  A@B.COM ", UserRole::User);
    assert!(matches!(
        repo.create(&mut shouting, "secret3"),
        Err(RepoError::Duplicate { field: "email", .. })
    ));
    assert_eq!(repo.count().unwrap(), 1);
}

#[test]
fn email_identity_ignores_case() {
    let db = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::new(&db);

    let mut user = User::new("Ana", "Ana.Perez@X.com", UserRole::User);
    let id = repo.create(&mut user, "secret1").unwrap();
    assert_eq!(user.email, "ana.perez@x.com");

    let found = repo.find_by_email("ANA.PEREZ@x.COM").unwrap().unwrap();
    assert_eq!(found.id(), Some(id));
    assert_eq!(found.email, "ana.perez@x.com");

    let authenticated = repo.authenticate("ANA.PEREZ@X.COM", "secret1").unwrap();
    assert_eq!(authenticated.and_then(|user| user.id()), Some(id));

    let mut other = User::new("Ben", "ben@x.com", UserRole::User);
    repo.create(&mut other, "secret2").unwrap();
    let err = repo
        .update(
            &mut other,
            UserPatch {
                email: Some("ANA.perez@x.com".to_string()),
                ..UserPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::Duplicate { field: "email", .. }));
    assert_eq!(other.email, "ben@x.com");
}

#[test]
fn invalid_fields_abort_before_insert_with_all_messages() {
    let db = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::new(&db);

    let mut user = User::new("A", "broken", UserRole::User);
    let err = repo.create(&mut user, "123").unwrap_err();
    match err {
        RepoError::Validation(report) => {
            assert!(!report.is_valid);
            assert_eq!(report.errors.len(), 3);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn create_twice_on_same_instance_is_rejected() {
    let db = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::new(&db);

    let mut user = ana();
    let id = repo.create(&mut user, "secret1").unwrap();
    let err = repo.create(&mut user, "secret1").unwrap_err();
    assert!(matches!(err, RepoError::AlreadyPersisted { id: existing, .. } if existing == id));
}

#[test]
fn find_all_is_newest_first_and_paginated() {
    let db = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::new(&db);

    for (name, email) in [("Ana", "ana@x.com"), ("Bea", "bea@x.com"), ("Cai", "cai@x.com")] {
        let mut user = User::new(name, email, UserRole::User);
        repo.create(&mut user, "secret1").unwrap();
    }

    let all = repo.find_all(Page::default()).unwrap();
    let names: Vec<_> = all.iter().map(|user| user.name.as_str()).collect();
    assert_eq!(names, vec!["Cai", "Bea", "Ana"]);

    let second_page = repo.find_all(Page::new(1, 1)).unwrap();
    assert_eq!(second_page.len(), 1);
    assert_eq!(second_page[0].name, "Bea");
}

#[test]
fn lookups_return_none_when_absent() {
    let db = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::new(&db);

    assert!(repo.find_by_id(42).unwrap().is_none());
    assert!(repo.find_by_email("nobody@x.com").unwrap().is_none());
}

#[test]
fn update_merges_patch_and_keeps_credentials() {
    let db = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::new(&db);

    let mut user = ana();
    let id = repo.create(&mut user, "secret1").unwrap();
    let hash_before = user.password_hash().to_string();

    repo.update(
        &mut user,
        UserPatch {
            name: Some("Ana María".to_string()),
            role: Some(UserRole::Admin),
            ..UserPatch::default()
        },
    )
    .unwrap();

    let loaded = repo.find_by_id(id).unwrap().unwrap();
    assert_eq!(loaded.name, "Ana María");
    assert_eq!(loaded.email, "ana@x.com");
    assert_eq!(loaded.role, UserRole::Admin);
    assert_eq!(loaded.password_hash(), hash_before);
    assert_eq!(user.id(), Some(id));
}

#[test]
fn update_rejects_invalid_patch_without_mutating() {
    let db = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::new(&db);

    let mut user = ana();
    repo.create(&mut user, "secret1").unwrap();

    let err = repo
        .update(
            &mut user,
            UserPatch {
                email: Some("not-an-email".to_string()),
                ..UserPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(user.email, "ana@x.com");
}

#[test]
fn update_to_taken_email_is_duplicate() {
    let db = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::new(&db);

    let mut first = ana();
    repo.create(&mut first, "secret1").unwrap();
    let mut second = User::new("Bea", "bea@x.com", UserRole::User);
    repo.create(&mut second, "secret1").unwrap();

    let err = repo
        .update(
            &mut second,
            UserPatch {
                email: Some("ana@x.com".to_string()),
                ..UserPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::Duplicate { .. }));
}

#[test]
fn operations_on_unsaved_user_require_id() {
    let db = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::new(&db);

    let mut user = ana();
    assert!(matches!(
        repo.update(&mut user, UserPatch::default()),
        Err(RepoError::MissingId { entity: "user" })
    ));
    assert!(matches!(
        repo.update_password(&mut user, "secret2"),
        Err(RepoError::MissingId { .. })
    ));
    assert!(matches!(repo.delete(&user), Err(RepoError::MissingId { .. })));
}

#[test]
fn update_password_rehashes_and_authenticates() {
    let db = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::new(&db);

    let mut user = ana();
    repo.create(&mut user, "secret1").unwrap();

    let short = repo.update_password(&mut user, "12345").unwrap_err();
    assert!(matches!(short, RepoError::Validation(_)));

    repo.update_password(&mut user, "another-secret").unwrap();
    assert!(repo.authenticate("ana@x.com", "secret1").unwrap().is_none());
    let authed = repo
        .authenticate("ana@x.com", "another-secret")
        .unwrap()
        .unwrap();
    assert_eq!(authed.id(), user.id());
}

#[test]
fn authenticate_returns_none_for_unknown_or_wrong_password() {
    let db = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::new(&db);

    let mut user = ana();
    repo.create(&mut user, "secret1").unwrap();

    assert!(repo.authenticate("ghost@x.com", "secret1").unwrap().is_none());
    assert!(repo.authenticate("ana@x.com", "wrong-pass").unwrap().is_none());
    assert!(repo.authenticate("ana@x.com", "secret1").unwrap().is_some());
}

#[test]
fn delete_reports_whether_row_was_removed() {
    let db = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::new(&db);

    let mut user = ana();
    let id = repo.create(&mut user, "secret1").unwrap();

    assert!(repo.delete(&user).unwrap());
    assert!(!repo.delete(&user).unwrap());
    assert!(repo.find_by_id(id).unwrap().is_none());
}

#[test]
fn delete_user_owning_quotes_is_a_dependency_error() {
    let db = open_db_in_memory().unwrap();
    let users = SqliteUserRepository::new(&db);
    let categories = SqliteCategoryRepository::new(&db);
    let quotes = SqliteQuoteRepository::new(&db);

    let mut user = ana();
    let user_id = users.create(&mut user, "secret1").unwrap();
    let mut category = Category::new("Hope", None);
    let category_id = categories.create(&mut category).unwrap();
    let mut quote = Quote::new("Every day is a gift to cherish", user_id, category_id);
    quotes.create(&mut quote).unwrap();

    let err = users.delete(&user).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Dependency {
            entity: "user",
            dependents: 1,
            ..
        }
    ));
    assert!(users.find_by_id(user_id).unwrap().is_some());
}

#[test]
fn serialization_omits_password_hash() {
    let db = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::new(&db);

    let mut user = ana();
    repo.create(&mut user, "secret1").unwrap();

    let json = serde_json::to_value(&user).unwrap();
    assert_eq!(json["nombre"], "Ana");
    assert_eq!(json["correo_electronico"], "ana@x.com");
    assert_eq!(json["rol"], "user");
    assert!(json.get("password_hash").is_none());
    assert!(!json.to_string().contains(user.password_hash()));
}
