use catalog_core::db::open_db_in_memory;
use catalog_core::query::QueryError;
use catalog_core::{
    Column, MetadataColumn, MetadataUser, Profile, RepoError, Sort, SortDirection,
    SqliteUserRepository, UserColumn, UserGroup, UserGroupId, UserRepository,
};
use rusqlite::{params, Connection};
use std::collections::BTreeSet;

const ALICE: i32 = 1;
const BOB: i32 = 2;
const CAROL: i32 = 3;
const DAVE: i32 = 4;

/// Groups 1..3 own metadata 100..102; metadata 103 has no owner.
///
/// Alice is an Editor in group 1 and a Reviewer in group 2, so role
/// filtering is exercised per joined membership row.
fn seeded_db() -> Connection {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO users (id, username, name, surname, organisation, profile) VALUES
            (1, 'alice', 'Alice', 'Zeller', 'Survey Office', 'Editor'),
            (2, 'bob', 'Bob', 'Adams', NULL, 'RegisteredUser'),
            (3, 'carol', 'Carol', 'Mills', NULL, 'Reviewer'),
            (4, 'dave', 'Dave', 'Brown', NULL, 'Administrator');
         INSERT INTO user_emails (user_id, email) VALUES
            (1, 'alice@example.org'),
            (1, 'shared@example.org'),
            (2, 'bob@example.org'),
            (2, 'shared@example.org'),
            (3, 'Carol@Example.org');
         INSERT INTO catalog_groups (id, name) VALUES
            (1, 'hydrology'),
            (2, 'geology'),
            (3, 'archive');
         INSERT INTO metadata (id, uuid, group_owner) VALUES
            (100, 'md-100', 1),
            (101, 'md-101', 2),
            (102, 'md-102', 3),
            (103, 'md-103', NULL);",
    )
    .unwrap();

    for membership in [
        membership(ALICE, 1, Profile::Editor),
        membership(BOB, 1, Profile::Reviewer),
        membership(CAROL, 2, Profile::Editor),
        membership(ALICE, 2, Profile::Reviewer),
        membership(DAVE, 3, Profile::Editor),
    ] {
        insert_membership(&conn, &membership);
    }
    conn
}

fn membership(user_id: i32, group_id: i32, profile: Profile) -> UserGroup {
    UserGroup {
        id: UserGroupId { user_id, group_id },
        profile,
    }
}

fn insert_membership(conn: &Connection, membership: &UserGroup) {
    conn.execute(
        "INSERT INTO user_groups (user_id, group_id, profile) VALUES (?1, ?2, ?3);",
        params![
            membership.id.user_id,
            membership.id.group_id,
            membership.profile.as_str()
        ],
    )
    .unwrap();
}

fn pair_keys(pairs: &[MetadataUser]) -> Vec<(i32, i32)> {
    pairs
        .iter()
        .map(|pair| (pair.metadata_id, pair.user.id))
        .collect()
}

fn pair_set(pairs: &[MetadataUser]) -> BTreeSet<(i32, i32)> {
    pair_keys(pairs).into_iter().collect()
}

fn user_ids(users: &[catalog_core::User]) -> BTreeSet<i32> {
    users.iter().map(|user| user.id).collect()
}

#[test]
fn find_one_returns_user_with_email_addresses() {
    let conn = seeded_db();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    let alice = repo.find_one("1").unwrap().unwrap();
    assert_eq!(alice.username, "alice");
    assert_eq!(alice.surname, "Zeller");
    assert_eq!(alice.organisation.as_deref(), Some("Survey Office"));
    assert_eq!(alice.profile, Profile::Editor);
    assert!(alice.enabled);
    assert_eq!(
        alice.email_addresses,
        BTreeSet::from([
            "alice@example.org".to_string(),
            "shared@example.org".to_string()
        ])
    );

    let dave = repo.find_one("4").unwrap().unwrap();
    assert!(dave.email_addresses.is_empty());
}

#[test]
fn find_one_returns_none_for_unknown_id() {
    let conn = seeded_db();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    assert!(repo.find_one("999").unwrap().is_none());
    assert!(repo.find_one("-1").unwrap().is_none());
}

#[test]
fn find_one_rejects_non_integer_ids() {
    let conn = seeded_db();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    for value in ["not-a-number", "", "1.5", "0x10", " 1"] {
        let err = repo.find_one(value).unwrap_err();
        assert!(
            matches!(&err, RepoError::InvalidId { value: v, .. } if v == value),
            "unexpected error for `{value}`: {err}"
        );
    }
}

#[test]
fn find_one_by_username_is_exact() {
    let conn = seeded_db();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    assert_eq!(repo.find_one_by_username("bob").unwrap().unwrap().id, BOB);
    assert!(repo.find_one_by_username("Bob").unwrap().is_none());
}

#[test]
fn find_all_by_email_returns_every_owner_of_the_address() {
    let conn = seeded_db();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    let shared = repo.find_all_by_email("shared@example.org").unwrap();
    assert_eq!(user_ids(&shared), BTreeSet::from([ALICE, BOB]));
    assert!(shared.iter().all(|user| user.has_email("shared@example.org")));

    let bob = repo.find_all_by_email("bob@example.org").unwrap();
    assert_eq!(user_ids(&bob), BTreeSet::from([BOB]));

    assert!(repo.find_all_by_email("nobody@example.org").unwrap().is_empty());
}

#[test]
fn find_all_by_email_is_case_sensitive_without_normalization() {
    let conn = seeded_db();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    assert!(repo.find_all_by_email("carol@example.org").unwrap().is_empty());
    assert!(repo.find_all_by_email(" Carol@Example.org").unwrap().is_empty());
    let carol = repo.find_all_by_email("Carol@Example.org").unwrap();
    assert_eq!(user_ids(&carol), BTreeSet::from([CAROL]));
}

#[test]
fn find_all_by_email_matches_each_inserted_user() {
    let conn = seeded_db();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    let everyone = [ALICE, BOB, CAROL, DAVE]
        .into_iter()
        .map(|id| repo.find_one(&id.to_string()).unwrap().unwrap())
        .collect::<Vec<_>>();

    for user in &everyone {
        for email in &user.email_addresses {
            let found = repo.find_all_by_email(email).unwrap();
            let expected = everyone
                .iter()
                .filter(|candidate| candidate.has_email(email))
                .map(|candidate| candidate.id)
                .collect::<BTreeSet<_>>();
            assert_eq!(user_ids(&found), expected, "email {email}");
        }
    }
}

#[test]
fn ownership_lookup_with_profile_matches_role_per_joined_row() {
    let conn = seeded_db();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    let editors = repo
        .find_all_by_group_owner_and_profile(&[100, 101], Some(Profile::Editor), None)
        .unwrap();

    // Alice is an Editor of group 1 only, so she is not paired with 101.
    assert_eq!(pair_set(&editors), BTreeSet::from([(100, ALICE), (101, CAROL)]));
    assert!(editors
        .iter()
        .all(|pair| pair.metadata_id == 100 || pair.metadata_id == 101));
    let alice = &editors
        .iter()
        .find(|pair| pair.user.id == ALICE)
        .unwrap()
        .user;
    assert!(alice.has_email("alice@example.org"));
}

#[test]
fn ownership_lookup_without_profile_is_union_of_all_roles() {
    let conn = seeded_db();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    let ids = [100, 101, 102, 103];

    let unfiltered = repo
        .find_all_by_group_owner_and_profile(&ids, None, None)
        .unwrap();

    let mut union = BTreeSet::new();
    for profile in Profile::ALL {
        let per_role = repo
            .find_all_by_group_owner_and_profile(&ids, Some(profile), None)
            .unwrap();
        assert!(pair_set(&per_role).is_subset(&pair_set(&unfiltered)));
        union.extend(pair_set(&per_role));
    }

    assert_eq!(pair_set(&unfiltered), union);
    assert_eq!(
        union,
        BTreeSet::from([
            (100, ALICE),
            (100, BOB),
            (101, CAROL),
            (101, ALICE),
            (102, DAVE),
        ])
    );
}

#[test]
fn ownership_lookup_repeats_user_once_per_metadata_id() {
    let conn = seeded_db();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    let pairs = repo
        .find_all_by_group_owner_and_profile(&[100, 101], None, None)
        .unwrap();
    let alice_rows = pairs.iter().filter(|pair| pair.user.id == ALICE).count();
    assert_eq!(alice_rows, 2);
    assert_eq!(pairs.len(), 4);
}

#[test]
fn ownership_lookup_with_empty_ids_is_empty() {
    let conn = seeded_db();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    let sort = Sort::by(Column::User(UserColumn::Surname), SortDirection::Asc);

    for profile in [None, Some(Profile::Editor)] {
        for sort in [None, Some(&sort)] {
            let pairs = repo
                .find_all_by_group_owner_and_profile(&[], profile, sort)
                .unwrap();
            assert!(pairs.is_empty());
        }
    }
}

#[test]
fn ownership_lookup_accepts_metadata_sets_beyond_bind_limit() {
    let conn = seeded_db();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    let ids = (1..=40_000).collect::<Vec<_>>();
    let sort = Sort::by(Column::Metadata(MetadataColumn::Id), SortDirection::Asc);

    let pairs = repo
        .find_all_by_group_owner_and_profile(&ids, Some(Profile::Editor), Some(&sort))
        .unwrap();

    assert_eq!(
        pair_keys(&pairs),
        vec![(100, ALICE), (101, CAROL), (102, DAVE)]
    );
    assert!(pairs[0].user.has_email("alice@example.org"));
}

#[test]
fn ownership_lookup_ignores_unowned_and_unknown_metadata() {
    let conn = seeded_db();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    let pairs = repo
        .find_all_by_group_owner_and_profile(&[103, 5000], None, None)
        .unwrap();
    assert!(pairs.is_empty());
}

#[test]
fn ownership_lookup_sorts_by_declared_priority() {
    let conn = seeded_db();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    let sort = Sort::by(Column::User(UserColumn::Surname), SortDirection::Asc)
        .then(Column::Metadata(MetadataColumn::Id), SortDirection::Desc);

    let pairs = repo
        .find_all_by_group_owner_and_profile(&[100, 101], None, Some(&sort))
        .unwrap();

    // Adams, Mills, then Zeller twice with the metadata tie broken descending.
    assert_eq!(
        pair_keys(&pairs),
        vec![(100, BOB), (101, CAROL), (101, ALICE), (100, ALICE)]
    );
    let surnames = pairs
        .iter()
        .map(|pair| pair.user.surname.as_str())
        .collect::<Vec<_>>();
    assert!(surnames.windows(2).all(|window| window[0] <= window[1]));
}

#[test]
fn ownership_lookup_accepts_parsed_sort_params() {
    let conn = seeded_db();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    let sort = Sort::parse_params(["metadata.id,desc", "userGroup.profile,asc"]).unwrap();

    let pairs = repo
        .find_all_by_group_owner_and_profile(&[100, 101, 102], None, Some(&sort))
        .unwrap();

    // Within one metadata id, Editor sorts before Reviewer.
    assert_eq!(
        pair_keys(&pairs),
        vec![
            (102, DAVE),
            (101, CAROL),
            (101, ALICE),
            (100, ALICE),
            (100, BOB)
        ]
    );
}

#[test]
fn malformed_sort_params_fail_before_querying() {
    assert_eq!(
        Sort::parse_params(["user.surname", "user.shoeSize,asc"]),
        Err(QueryError::UnknownSortField("user.shoeSize".to_string()))
    );
    assert_eq!(
        Sort::parse_params(["", "user.surname"]),
        Err(QueryError::EmptySortField)
    );
}

#[test]
fn try_new_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteUserRepository::try_new(&conn).err().unwrap();
    assert!(matches!(err, RepoError::MissingRequiredTable("users")));
}

#[test]
fn storage_failures_pass_through_as_db_errors() {
    let conn = seeded_db();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    conn.execute_batch("DROP TABLE user_emails;").unwrap();

    let err = repo.find_all_by_email("bob@example.org").unwrap_err();
    assert!(matches!(err, RepoError::Db(_)));
}
