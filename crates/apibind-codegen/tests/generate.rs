use apibind_codegen::codegen::CodeGenerator;
use apibind_codegen::decode::{DecodePlans, DecodedUnion};
use apibind_codegen::error::CodegenError;
use apibind_codegen::overrides::OverrideTables;
use apibind_codegen::resolver::resolve;
use apibind_codegen::schema::Schema;
use serde_json::json;
use std::path::Path;

fn load_fixture() -> (Schema, OverrideTables) {
    let schema = Schema::load_from_file("tests/fixtures/schema.json").expect("load schema");
    let overrides =
        OverrideTables::load_from_file("tests/fixtures/overrides.kdl").expect("load overrides");
    (schema, overrides)
}

fn generate_into(dir: &Path) {
    let (schema, overrides) = load_fixture();
    let resolution = resolve(&schema, &overrides).expect("resolution");
    let plans = DecodePlans::build(&resolution.registry, &overrides).expect("plans");
    CodeGenerator::new(&resolution, &plans, &overrides)
        .with_schema_version(schema.version.clone())
        .write_to_disk(dir)
        .expect("write");
}

#[test]
fn generation_is_byte_identical_across_runs() {
    let first = tempfile::tempdir().expect("tempdir");
    let second = tempfile::tempdir().expect("tempdir");
    generate_into(first.path());
    generate_into(second.path());

    for file in ["types.rs", "decode.rs", "mod.rs"] {
        let a = std::fs::read(first.path().join(file)).expect("first run output");
        let b = std::fs::read(second.path().join(file)).expect("second run output");
        assert_eq!(a, b, "{} differs between runs", file);
    }
}

#[test]
fn generated_files_cover_the_fixture() {
    let dir = tempfile::tempdir().expect("tempdir");
    generate_into(dir.path());

    let types = std::fs::read_to_string(dir.path().join("types.rs")).expect("types.rs");
    assert!(types.contains("// Schema: Pet API 1.2"));
    for needle in [
        "pub enum Animal",
        "pub enum ChatMember",
        "pub enum EitherBirdFish",
        "pub enum MaybeInaccessibleMessage",
        "pub struct ChatMemberUpdated",
        "pub struct Kennel",
        "pub guest: std::option::Option<EitherBirdFish>",
        "pub visitors: Vec<EitherBirdFish>",
        "pub avatar: std::option::Option<crate::InputFile>",
    ] {
        assert!(types.contains(needle), "types.rs is missing `{}`", needle);
    }
    assert!(!types.contains("pub struct InternalOnly"));

    let decode = std::fs::read_to_string(dir.path().join("decode.rs")).expect("decode.rs");
    for needle in [
        "fn decode_chat_member(",
        "fn decode_either_bird_fish(",
        "struct ChatMemberUpdatedRaw",
        "payload matches no option of ChatMember",
    ] {
        assert!(decode.contains(needle), "decode.rs is missing `{}`", needle);
    }
}

#[test]
fn interpreter_follows_the_discriminator() {
    let (schema, overrides) = load_fixture();
    let resolution = resolve(&schema, &overrides).expect("resolution");
    let plans = DecodePlans::build(&resolution.registry, &overrides).expect("plans");

    let update = plans
        .decode_struct(
            "ChatMemberUpdated",
            &json!({
                "date": 1,
                "old_chat_member": {"status": "member", "user": {"id": 1, "first_name": "A"}},
                "new_chat_member": {"status": "kicked", "user": {"id": 1, "first_name": "A"}}
            }),
        )
        .expect("decode");

    let old = update.unions["old_chat_member"]
        .variant()
        .expect("old member");
    assert_eq!(old.name, "ChatMemberMember");
    let new = update.unions["new_chat_member"]
        .variant()
        .expect("new member");
    assert_eq!(new.name, "ChatMemberBanned");
    assert_eq!(new.fields["until_date"], json!(0));

    let unknown = plans
        .decode_union("ChatMember", &json!({"status": "restricted"}))
        .expect("decode");
    assert_eq!(unknown, DecodedUnion::Empty);
}

#[test]
fn stalled_resolution_writes_nothing() {
    let schema = Schema::from_json(
        r#"{"types": {
            "A": {"name": "A", "fields": [{"name": "b", "types": ["B"], "required": true}]},
            "B": {"name": "B", "fields": [{"name": "a", "types": ["A"], "required": true}]}
        }}"#,
    )
    .expect("schema");
    let overrides = OverrideTables::default();

    match resolve(&schema, &overrides) {
        Err(CodegenError::ResolutionStalled { unresolved, .. }) => {
            assert_eq!(unresolved, vec!["A", "B"]);
        }
        other => panic!("expected a stall, got {:?}", other.map(|r| r.passes)),
    }
}
