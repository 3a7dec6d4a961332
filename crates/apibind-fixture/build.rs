use apibind_codegen::codegen::CodeGenerator;
use apibind_codegen::decode::DecodePlans;
use apibind_codegen::overrides::OverrideTables;
use apibind_codegen::resolver::resolve;
use apibind_codegen::schema::Schema;
use std::env;
use std::error::Error;
use std::path::{Path, PathBuf};

fn main() -> Result<(), Box<dyn Error>> {
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("../apibind-codegen/tests/fixtures");
    let schema_path = fixtures.join("schema.json");
    let overrides_path = fixtures.join("overrides.kdl");
    println!("cargo:rerun-if-changed={}", schema_path.display());
    println!("cargo:rerun-if-changed={}", overrides_path.display());

    let schema = Schema::load_from_file(&schema_path)?;
    let overrides = OverrideTables::load_from_file(&overrides_path)?;
    let resolution = resolve(&schema, &overrides)?;
    let plans = DecodePlans::build(&resolution.registry, &overrides)?;

    let out_dir = PathBuf::from(env::var("OUT_DIR")?).join("generated");
    CodeGenerator::new(&resolution, &plans, &overrides)
        .with_schema_version(schema.version.clone())
        .write_to_disk(&out_dir)?;

    Ok(())
}
