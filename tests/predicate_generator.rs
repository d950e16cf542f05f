use shelfkeeper::ShelfkeeperError;
use shelfkeeper::filter::{Column, FilterSet};

#[test]
fn predicate_lists_only_filtered_columns_in_column_order() {
    // email given first, still ends up after nickname
    let filters = FilterSet::new()
        .with(Column::Email, ["%@example.com"])
        .with(Column::Nickname, ["alice"]);
    assert_eq!(filters.predicate().unwrap(), "nickname LIKE ? AND email LIKE ?");

    let only_email = FilterSet::new().with(Column::Email, ["%@aol.com"]);
    assert_eq!(only_email.predicate().unwrap(), "email LIKE ?");
}

#[test]
fn product_is_enumerated_outer_to_inner() {
    let filters = FilterSet::new()
        .with(Column::Nickname, ["alice", "bob"])
        .with(Column::Email, ["%@example.com", "%@aol.com", "%@school.edu"]);
    let tuples: Vec<Vec<&str>> = filters.combinations().unwrap().collect();
    assert_eq!(
        tuples,
        vec![
            vec!["alice", "%@example.com"],
            vec!["alice", "%@aol.com"],
            vec!["alice", "%@school.edu"],
            vec!["bob", "%@example.com"],
            vec!["bob", "%@aol.com"],
            vec!["bob", "%@school.edu"],
        ]
    );
    assert_eq!(filters.combination_count(), 6);
}

#[test]
fn tuple_count_is_product_of_list_lengths() {
    for (n, e) in [(1, 1), (1, 4), (3, 2), (5, 5)] {
        let nicknames: Vec<String> = (0..n).map(|i| format!("n{i}")).collect();
        let emails: Vec<String> = (0..e).map(|i| format!("e{i}")).collect();
        let filters = FilterSet::new()
            .with(Column::Nickname, nicknames)
            .with(Column::Email, emails);
        let combinations = filters.combinations().unwrap();
        assert_eq!(combinations.len(), n * e);
        let tuples: Vec<_> = combinations.collect();
        assert_eq!(tuples.len(), n * e);
        assert!(tuples.iter().all(|t| t.len() == 2));
    }
}

#[test]
fn empty_pattern_list_is_the_same_as_no_patterns() {
    let filters = FilterSet::new()
        .with(Column::Nickname, Vec::<String>::new())
        .with(Column::Email, ["%@aol.com", "%@example.com"]);
    assert_eq!(filters.predicate().unwrap(), "email LIKE ?");
    let tuples: Vec<_> = filters.combinations().unwrap().collect();
    assert_eq!(tuples, vec![vec!["%@aol.com"], vec!["%@example.com"]]);
    assert_eq!(
        filters.included().map(|(c, _)| c).collect::<Vec<_>>(),
        vec![Column::Email]
    );
}

#[test]
fn no_patterns_at_all_is_rejected() {
    let filters = FilterSet::new();
    assert!(matches!(filters.predicate(), Err(ShelfkeeperError::InvalidFilter)));
    assert!(matches!(filters.combinations(), Err(ShelfkeeperError::InvalidFilter)));
    assert_eq!(filters.combination_count(), 0);

    let empty_lists = FilterSet::new()
        .with(Column::Nickname, Vec::<String>::new())
        .with(Column::Email, Vec::<String>::new());
    assert!(matches!(empty_lists.validate(), Err(ShelfkeeperError::InvalidFilter)));
}

#[test]
fn patterns_accumulate_per_column() {
    let mut filters = FilterSet::new().with(Column::Nickname, ["alice"]);
    filters.add(Column::Nickname, ["bob"]);
    let tuples: Vec<_> = filters.combinations().unwrap().collect();
    assert_eq!(tuples, vec![vec!["alice"], vec!["bob"]]);
}

#[test]
fn size_hint_counts_down() {
    let filters = FilterSet::new()
        .with(Column::Nickname, ["a", "b"])
        .with(Column::Email, ["x", "y"]);
    let mut combinations = filters.combinations().unwrap();
    assert_eq!(combinations.len(), 4);
    combinations.next();
    assert_eq!(combinations.len(), 3);
    combinations.next();
    combinations.next();
    combinations.next();
    assert_eq!(combinations.len(), 0);
    assert!(combinations.next().is_none());
}
