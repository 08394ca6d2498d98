use relmap::{
    Cursor, Mapped, MapperConfig, MetadataError, OrmError, Registry, Value, VecCursor,
};

#[derive(Debug, Default, PartialEq, Mapped)]
#[orm(table = "langs")]
struct Lang {
    #[orm("column:id;primary")]
    id: i64,
    #[orm("column:name")]
    name: String,
}

#[derive(Debug, Default, PartialEq, Mapped)]
struct Profile {
    #[orm("column:id;primary;auto_increment")]
    #[orm(ns = "legacy", tag = "column:profile_id;primary")]
    id: u64,
    #[orm("column:nickname")]
    nickname: Option<String>,
    #[orm("column:score;type:double")]
    score: f64,
    #[orm(ns = "legacy", tag = "column:legacy_flags")]
    flags: i32,
    // not mapped, and not even a column type
    cache: Vec<String>,
}

#[derive(Debug, Default, Mapped)]
#[orm(table = "pointers")]
struct Pointer {
    #[orm("column:id;primary")]
    id: Box<i64>,
}

#[derive(Debug, Default, Mapped)]
#[orm(table = "broken")]
struct BrokenTag {
    #[orm("column:a;;column:b")]
    id: i64,
}

#[test]
fn maps_id_and_name() {
    let registry = Registry::default();
    let mut cursor = VecCursor::new(["id", "name"], vec![vec![Value::Int(1), Value::from("go")]]);
    let mut lang = Lang::default();
    registry.map_row(&mut cursor, &mut lang).unwrap();
    assert_eq!(
        lang,
        Lang {
            id: 1,
            name: "go".to_string()
        }
    );
}

#[test]
fn derive_defaults_table_to_snake_case() {
    let registry = Registry::default();
    let schema = registry.schema::<Profile>().unwrap();
    assert_eq!(schema.table(), "profile");
    assert_eq!(Profile::table_name(), "profile");

    let names: Vec<_> = schema.columns().iter().map(|c| c.name()).collect();
    assert_eq!(names, ["id", "nickname", "score"]);
    assert_eq!(schema.column("score").unwrap().type_hint(), Some("double"));
    assert!(schema.column("id").unwrap().is_auto_increment());
}

#[test]
fn subset_rows_leave_untagged_fields_alone() {
    let registry = Registry::default();
    let mut cursor = VecCursor::new(
        ["score", "unknown", "id"],
        vec![vec![Value::Float(2.5), Value::from("ignored"), Value::Int(4)]],
    );
    let mut profile = Profile {
        cache: vec!["warm".into()],
        flags: 3,
        nickname: Some("kept".into()),
        ..Profile::default()
    };
    registry.map_row(&mut cursor, &mut profile).unwrap();
    assert_eq!(profile.id, 4);
    assert_eq!(profile.score, 2.5);
    assert_eq!(profile.nickname.as_deref(), Some("kept"));
    assert_eq!(profile.flags, 3);
    assert_eq!(profile.cache, ["warm"]);
}

#[test]
fn namespace_selects_alternate_tags() {
    let registry = Registry::new(MapperConfig::new().with_namespace("legacy"));
    let mut cursor = VecCursor::new(
        ["profile_id", "legacy_flags", "nickname"],
        vec![vec![Value::Int(8), Value::Int(1), Value::from("x")]],
    );
    let profiles: Vec<Profile> = registry.map_rows(&mut cursor).unwrap();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].id, 8);
    assert_eq!(profiles[0].flags, 1);
    // `nickname` has no tag in the legacy namespace.
    assert_eq!(profiles[0].nickname, None);
}

#[test]
fn null_into_required_field_is_a_decode_error() {
    let registry = Registry::default();
    let mut cursor = VecCursor::new(["id", "name"], vec![vec![Value::Int(1), Value::Null]]);
    let mut lang = Lang::default();
    let err = registry.map_row(&mut cursor, &mut lang).unwrap_err();
    assert!(matches!(err, OrmError::Decode { ref column, .. } if column == "name"));
    assert_eq!(lang, Lang::default());
}

#[test]
fn pointer_fields_are_rejected() {
    let registry = Registry::default();
    let err = registry.schema::<Pointer>().unwrap_err();
    assert!(matches!(
        err,
        OrmError::Metadata(MetadataError::PointerFieldNotAllowed { ref field }) if field == "id"
    ));
}

#[test]
fn duplicate_tag_keys_are_reported_with_field() {
    let registry = Registry::default();
    let err = registry.schema::<BrokenTag>().unwrap_err();
    assert!(matches!(err, OrmError::TagParse { ref field, .. } if field == "id"));
}

#[test]
fn map_rows_reads_until_exhausted() {
    let registry = Registry::default();
    let rows = (1..=5)
        .map(|i| vec![Value::Int(i), Value::from(format!("lang-{i}"))])
        .collect();
    let mut cursor = VecCursor::new(["id", "name"], rows);
    let langs: Vec<Lang> = registry.map_rows(&mut cursor).unwrap();
    assert_eq!(langs.len(), 5);
    assert_eq!(langs[4].name, "lang-5");
    assert!(!cursor.advance().unwrap());
}
