use gratitude_core::{
    now_epoch_ms, open_db_in_memory, Category, CategoryId, CategoryRepository, ConnectionManager,
    Quote, QuotePatch, QuoteRepository, QuoteStatus, RepoError, SqliteCategoryRepository,
    SqliteQuoteRepository, SqliteUserRepository, User, UserId, UserRepository, UserRole,
};

const HOUR_MS: i64 = 60 * 60 * 1000;

fn seed(db: &ConnectionManager) -> (UserId, CategoryId) {
    let mut user = User::new("Ana", "ana@x.com", UserRole::User);
    let user_id = SqliteUserRepository::new(db)
        .create(&mut user, "secret1")
        .unwrap();
    let mut category = Category::new("Hope", None);
    let category_id = SqliteCategoryRepository::new(db)
        .create(&mut category)
        .unwrap();
    (user_id, category_id)
}

#[test]
fn new_quotes_start_as_draft() {
    let db = open_db_in_memory().unwrap();
    let (user_id, category_id) = seed(&db);
    let repo = SqliteQuoteRepository::new(&db);

    let mut quote = Quote::new("Every day is a gift to cherish", user_id, category_id);
    let id = repo.create(&mut quote).unwrap();

    let loaded = repo.find_by_id(id, false).unwrap().unwrap();
    assert_eq!(loaded.status, QuoteStatus::Draft);
    assert_eq!(loaded.scheduled_at, None);
    assert!(loaded.created_at.is_some());
    assert_eq!(loaded.creator_name, None);
    assert_eq!(loaded.category_name, None);
}

#[test]
fn find_by_id_with_details_joins_names() {
    let db = open_db_in_memory().unwrap();
    let (user_id, category_id) = seed(&db);
    let repo = SqliteQuoteRepository::new(&db);

    let mut quote = Quote::new("Every day is a gift to cherish", user_id, category_id)
        .with_author("Unknown");
    let id = repo.create(&mut quote).unwrap();

    let detailed = repo.find_by_id(id, true).unwrap().unwrap();
    assert_eq!(detailed.creator_name.as_deref(), Some("Ana"));
    assert_eq!(detailed.category_name.as_deref(), Some("Hope"));
    assert_eq!(detailed.author.as_deref(), Some("Unknown"));
    assert!(repo.find_by_id(id + 100, true).unwrap().is_none());
}

#[test]
fn scheduling_in_the_past_fails_validation() {
    let db = open_db_in_memory().unwrap();
    let (user_id, category_id) = seed(&db);
    let repo = SqliteQuoteRepository::new(&db);

    let mut quote = Quote::new("Every day is a gift to cherish", user_id, category_id);
    repo.create(&mut quote).unwrap();

    let err = repo
        .schedule(&mut quote, now_epoch_ms() - HOUR_MS)
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(quote.status, QuoteStatus::Draft);

    let stored = repo.find_by_id(quote.id().unwrap(), false).unwrap().unwrap();
    assert_eq!(stored.status, QuoteStatus::Draft);
}

#[test]
fn schedule_roundtrips_and_publish_clears_timestamp() {
    let db = open_db_in_memory().unwrap();
    let (user_id, category_id) = seed(&db);
    let repo = SqliteQuoteRepository::new(&db);

    let mut quote = Quote::new("Every day is a gift to cherish", user_id, category_id);
    let id = repo.create(&mut quote).unwrap();

    let at = now_epoch_ms() + HOUR_MS;
    repo.schedule(&mut quote, at).unwrap();
    assert_eq!(quote.status, QuoteStatus::Scheduled);

    let scheduled = repo.find_by_id(id, false).unwrap().unwrap();
    assert_eq!(scheduled.status, QuoteStatus::Scheduled);
    assert_eq!(scheduled.scheduled_at, Some(at));

    repo.publish(&mut quote).unwrap();
    let published = repo.find_by_id(id, false).unwrap().unwrap();
    assert_eq!(published.status, QuoteStatus::Published);
    assert_eq!(published.scheduled_at, None);
    assert_eq!(quote, published);
}

#[test]
fn draft_returns_any_state_to_draft() {
    let db = open_db_in_memory().unwrap();
    let (user_id, category_id) = seed(&db);
    let repo = SqliteQuoteRepository::new(&db);

    let mut quote = Quote::new("Every day is a gift to cherish", user_id, category_id)
        .with_status(QuoteStatus::Published);
    let id = repo.create(&mut quote).unwrap();

    repo.draft(&mut quote).unwrap();
    let stored = repo.find_by_id(id, false).unwrap().unwrap();
    assert_eq!(stored.status, QuoteStatus::Draft);

    repo.schedule(&mut quote, now_epoch_ms() + HOUR_MS).unwrap();
    repo.draft(&mut quote).unwrap();
    let stored = repo.find_by_id(id, false).unwrap().unwrap();
    assert_eq!(stored.status, QuoteStatus::Draft);
    assert_eq!(stored.scheduled_at, None);
}

#[test]
fn create_scheduled_without_timestamp_fails() {
    let db = open_db_in_memory().unwrap();
    let (user_id, category_id) = seed(&db);
    let repo = SqliteQuoteRepository::new(&db);

    let mut quote = Quote::new("Every day is a gift to cherish", user_id, category_id)
        .with_status(QuoteStatus::Scheduled);
    let err = repo.create(&mut quote).unwrap_err();
    match err {
        RepoError::Validation(report) => {
            assert_eq!(report.errors.len(), 1);
            assert!(report.errors[0].contains("scheduled"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(quote.id(), None);
}

#[test]
fn update_revalidates_the_merged_quote() {
    let db = open_db_in_memory().unwrap();
    let (user_id, category_id) = seed(&db);
    let repo = SqliteQuoteRepository::new(&db);

    let mut quote = Quote::new("Every day is a gift to cherish", user_id, category_id);
    let id = repo.create(&mut quote).unwrap();

    let err = repo
        .update(
            &mut quote,
            QuotePatch {
                status: Some(QuoteStatus::Scheduled),
                ..QuotePatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));

    repo.update(
        &mut quote,
        QuotePatch {
            text: Some("Small joys add up to a big life".to_string()),
            author: Some(Some("Someone wise".to_string())),
            ..QuotePatch::default()
        },
    )
    .unwrap();

    let stored = repo.find_by_id(id, false).unwrap().unwrap();
    assert_eq!(stored.text, "Small joys add up to a big life");
    assert_eq!(stored.author.as_deref(), Some("Someone wise"));
    assert_eq!(stored.status, QuoteStatus::Draft);
}

#[test]
fn missing_references_surface_as_reference_errors() {
    let db = open_db_in_memory().unwrap();
    let (user_id, category_id) = seed(&db);
    let repo = SqliteQuoteRepository::new(&db);

    let mut orphan_user = Quote::new("Every day is a gift to cherish", user_id + 50, category_id);
    assert!(matches!(
        repo.create(&mut orphan_user),
        Err(RepoError::Reference { entity: "user" })
    ));

    let mut orphan_category =
        Quote::new("Every day is a gift to cherish", user_id, category_id + 50);
    assert!(matches!(
        repo.create(&mut orphan_category),
        Err(RepoError::Reference { entity: "category" })
    ));

    let mut quote = Quote::new("Every day is a gift to cherish", user_id, category_id);
    repo.create(&mut quote).unwrap();
    let err = repo
        .update(
            &mut quote,
            QuotePatch {
                category_id: Some(category_id + 50),
                ..QuotePatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::Reference { entity: "category" }));
    assert_eq!(quote.category_id, category_id);
}

#[test]
fn lifecycle_operations_require_a_persisted_quote() {
    let db = open_db_in_memory().unwrap();
    let repo = SqliteQuoteRepository::new(&db);

    let mut quote = Quote::new("Every day is a gift to cherish", 1, 1);
    assert!(matches!(
        repo.publish(&mut quote),
        Err(RepoError::MissingId { entity: "quote" })
    ));
    assert!(matches!(
        repo.schedule(&mut quote, now_epoch_ms() + HOUR_MS),
        Err(RepoError::MissingId { .. })
    ));
    assert!(matches!(repo.draft(&mut quote), Err(RepoError::MissingId { .. })));
    assert!(matches!(repo.delete(&quote), Err(RepoError::MissingId { .. })));
}

#[test]
fn delete_is_unconditional_and_reports_removal() {
    let db = open_db_in_memory().unwrap();
    let (user_id, category_id) = seed(&db);
    let repo = SqliteQuoteRepository::new(&db);

    let mut quote = Quote::new("Every day is a gift to cherish", user_id, category_id)
        .with_status(QuoteStatus::Published);
    let id = repo.create(&mut quote).unwrap();

    assert!(repo.delete(&quote).unwrap());
    assert!(!repo.delete(&quote).unwrap());
    assert!(repo.find_by_id(id, false).unwrap().is_none());
}

#[test]
fn serialization_uses_store_field_names() {
    let db = open_db_in_memory().unwrap();
    let (user_id, category_id) = seed(&db);
    let repo = SqliteQuoteRepository::new(&db);

    let mut quote = Quote::new("Every day is a gift to cherish", user_id, category_id);
    let id = repo.create(&mut quote).unwrap();
    let detailed = repo.find_by_id(id, true).unwrap().unwrap();

    let json = serde_json::to_value(&detailed).unwrap();
    assert_eq!(json["id_quote"], id);
    assert_eq!(json["texto"], "Every day is a gift to cherish");
    assert_eq!(json["status"], "draft");
    assert_eq!(json["creado_por_nombre"], "Ana");
    assert_eq!(json["categoria_nombre"], "Hope");

    let plain = serde_json::to_value(&quote).unwrap();
    assert!(plain.get("categoria_nombre").is_none());
}
