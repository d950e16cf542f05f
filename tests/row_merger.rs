use std::cell::Cell;

use rusqlite::types::Value;
use shelfkeeper::merge::{RowMerger, TemplateRow};
use shelfkeeper::password::{PasswordHasher, Pbkdf2Hasher, verify_password};
use shelfkeeper::record::InputRecord;
use shelfkeeper::{Result, ShelfkeeperError};

fn template() -> TemplateRow {
    TemplateRow::from_account(
        ["id", "nickname", "email", "role", "password", "locale"]
            .map(String::from)
            .to_vec(),
        vec![
            Value::Integer(1),
            Value::Text("template_account".into()),
            Value::Text("template@example.com".into()),
            Value::Integer(2),
            Value::Text("pbkdf2:sha256:1$x$y".into()),
            Value::Text("en".into()),
        ],
        "id",
    )
}

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

/// Records every password it is asked to hash.
#[derive(Default)]
struct CountingHasher {
    calls: Cell<usize>,
}

impl PasswordHasher for CountingHasher {
    fn hash(&self, password: &str) -> Result<String> {
        self.calls.set(self.calls.get() + 1);
        Ok(format!("hashed:{password}:{}", self.calls.get()))
    }
}

struct RefusingHasher;

impl PasswordHasher for RefusingHasher {
    fn hash(&self, _password: &str) -> Result<String> {
        Err(ShelfkeeperError::Hashing("refused".into()))
    }
}

#[test]
fn template_drops_the_key_column() {
    let template = template();
    assert_eq!(template.columns(), ["nickname", "email", "role", "password", "locale"]);
    assert!(template.get("id").is_none());
    assert_eq!(
        template.insert_statement("user"),
        "INSERT OR IGNORE INTO \"user\"(\"nickname\", \"email\", \"role\", \"password\", \"locale\") VALUES (?, ?, ?, ?, ?)"
    );
}

#[test]
fn values_come_out_in_template_order() {
    let template = template();
    let merger = RowMerger::new(&template, CountingHasher::default(), None, None).unwrap();
    // input order differs from template order
    let record = InputRecord::new([("locale", "de"), ("email", "dan@x.com"), ("nickname", "dan")]);
    let values = merger.merge(&record).unwrap().into_values();
    assert_eq!(
        values,
        vec![
            text("dan"),
            text("dan@x.com"),
            Value::Integer(2),
            text("pbkdf2:sha256:1$x$y"),
            text("de"),
        ]
    );
}

#[test]
fn field_names_match_case_insensitively() {
    let template = template();
    let merger = RowMerger::new(&template, CountingHasher::default(), None, None).unwrap();
    let record = InputRecord::new([
        ("NickName", "erin"),
        ("EMAIL", "erin@x.com"),
        ("Shoe_Size", "42"),
    ]);
    let merged = merger.merge(&record).unwrap();
    assert_eq!(merged.get("nickname"), Some(&text("erin")));
    assert_eq!(merged.get("email"), Some(&text("erin@x.com")));
    // unknown fields are not carried
    assert_eq!(merged.overrides().len(), 2);
}

#[test]
fn default_password_is_hashed_once_and_reused() {
    let template = template();
    let hasher = CountingHasher::default();
    let merger = RowMerger::new(&template, &hasher, None, Some("changeme")).unwrap();
    assert_eq!(hasher.calls.get(), 1);

    let first = merger.merge(&InputRecord::new([("nickname", "a")])).unwrap();
    let second = merger.merge(&InputRecord::new([("nickname", "b")])).unwrap();
    assert_eq!(hasher.calls.get(), 1);
    assert_eq!(first.get("password"), second.get("password"));
    assert_eq!(first.get("password"), Some(&text("hashed:changeme:1")));
}

#[test]
fn default_password_hash_is_identical_with_real_hasher() {
    let template = template();
    let merger =
        RowMerger::new(&template, Pbkdf2Hasher::new(10, 16), None, Some("changeme")).unwrap();
    let default_hash = merger.default_password_hash().unwrap().to_string();
    let rows: Vec<Vec<Value>> = merger
        .rows(vec![
            Ok(InputRecord::new([("nickname", "a")])),
            Ok(InputRecord::new([("nickname", "b")])),
        ])
        .collect::<Result<_>>()
        .unwrap();
    for row in &rows {
        assert_eq!(row[3], Value::Text(default_hash.clone()));
    }
    assert!(verify_password(&default_hash, "changeme"));
}

#[test]
fn explicit_password_wins_and_is_hashed_per_row() {
    let template = template();
    let hasher = CountingHasher::default();
    let merger = RowMerger::new(&template, &hasher, None, Some("changeme")).unwrap();
    let merged = merger
        .merge(&InputRecord::new([("nickname", "frank"), ("Password", "hunter2")]))
        .unwrap();
    assert_eq!(hasher.calls.get(), 2);
    assert_eq!(merged.get("password"), Some(&text("hashed:hunter2:2")));
}

#[test]
fn email_is_made_from_nickname_and_domain() {
    let template = template();
    let domain = Some("example.com".into());
    let merger = RowMerger::new(&template, CountingHasher::default(), domain, None).unwrap();
    let merged = merger.merge(&InputRecord::new([("nickname", "bob")])).unwrap();
    assert_eq!(merged.get("email"), Some(&text("bob@example.com")));
}

#[test]
fn without_domain_email_stays_from_template() {
    let template = template();
    let merger = RowMerger::new(&template, CountingHasher::default(), None, None).unwrap();
    let merged = merger.merge(&InputRecord::new([("nickname", "bob")])).unwrap();
    assert_eq!(merged.get("email"), Some(&text("template@example.com")));
}

#[test]
fn nickname_falls_back_to_email() {
    let template = template();
    let domain = Some("example.com".into());
    let merger = RowMerger::new(&template, CountingHasher::default(), domain, None).unwrap();
    let merged = merger.merge(&InputRecord::new([("email", "carol@x.com")])).unwrap();
    assert_eq!(merged.get("nickname"), Some(&text("carol@x.com")));
    assert_eq!(merged.get("email"), Some(&text("carol@x.com")));
}

#[test]
fn explicit_email_is_not_replaced_by_domain() {
    let template = template();
    let domain = Some("example.com".into());
    let merger = RowMerger::new(&template, CountingHasher::default(), domain, None).unwrap();
    let merged = merger
        .merge(&InputRecord::new([("nickname", "gina"), ("email", "gina@elsewhere.org")]))
        .unwrap();
    assert_eq!(merged.get("email"), Some(&text("gina@elsewhere.org")));
}

#[test]
fn merging_leaves_the_template_untouched() {
    let template = template();
    let before = template.clone();
    let merger = RowMerger::new(&template, CountingHasher::default(), None, Some("pw")).unwrap();
    merger.merge(&InputRecord::new([("nickname", "hank")])).unwrap();
    assert_eq!(template, before);
}

#[test]
fn hashing_failure_stops_before_any_row() {
    let template = template();
    let result = RowMerger::new(&template, RefusingHasher, None, Some("pw"));
    assert!(matches!(result, Err(ShelfkeeperError::Hashing(_))));
}

#[test]
fn record_errors_pass_through_rows() {
    let template = template();
    let merger = RowMerger::new(&template, CountingHasher::default(), None, None).unwrap();
    let mut rows = merger.rows(vec![
        Ok(InputRecord::new([("nickname", "ivan")])),
        Err(ShelfkeeperError::RecordFormat { line: 3, message: "bad".into() }),
    ]);
    assert!(rows.next().unwrap().is_ok());
    assert!(matches!(
        rows.next().unwrap(),
        Err(ShelfkeeperError::RecordFormat { line: 3, .. })
    ));
}
