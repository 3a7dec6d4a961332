use apibind_codegen::codegen::CodeGenerator;
use apibind_codegen::decode::DecodePlans;
use apibind_codegen::overrides::OverrideTables;
use apibind_codegen::registry::ResolvedKind;
use apibind_codegen::resolver::{Resolution, resolve};
use apibind_codegen::schema::Schema;
use clap::Parser;
use miette::{IntoDiagnostic, miette};
use tracing_subscriber::EnvFilter;

#[path = "../cli.rs"]
mod cli;

use cli::CodegenArgs;

fn main() -> miette::Result<()> {
    let args = CodegenArgs::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    println!("Loading schema from {:?}...", args.input);
    let schema = Schema::load_from_file(&args.input)?;
    println!("Loaded {} types", schema.len());

    let overrides = match &args.overrides {
        Some(path) => OverrideTables::load_from_file(path)?,
        None => OverrideTables::builtin()?,
    };

    println!("Resolving types...");
    let resolution = resolve(&schema, &overrides)?;
    let plans = DecodePlans::build(&resolution.registry, &overrides)?;
    report(&resolution, &plans);

    if let Some(check) = &args.check {
        let [ty, payload] = check.as_slice() else {
            return Err(miette!("--check takes a type name and a payload file"));
        };
        return check_payload(&resolution, &plans, ty, payload);
    }

    if args.dry_run {
        println!("Dry run, nothing written");
        return Ok(());
    }

    let Some(output) = &args.output else {
        return Err(miette!("--output is required unless --dry-run or --check is given"));
    };

    println!("Generating code...");
    let codegen = CodeGenerator::new(&resolution, &plans, &overrides)
        .with_schema_version(schema.version.clone());
    let written = codegen.write_to_disk(output)?;

    println!("✨ Generated {} files to {:?}", written.len(), output);

    Ok(())
}

fn report(resolution: &Resolution, plans: &DecodePlans<'_>) {
    let registry = &resolution.registry;
    println!(
        "Resolved {} types in {} passes: {} structs, {} unions",
        registry.len(),
        resolution.passes,
        registry.structs().count(),
        registry.unions().count(),
    );
    if !resolution.placeholders.is_empty() {
        println!(
            "Placeholders: {}",
            resolution
                .placeholders
                .iter()
                .map(|p| p.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    let warnings = resolution.warnings.len() + plans.warnings().len();
    if warnings > 0 {
        println!("{} warning(s)", warnings);
    }
}

fn check_payload(
    resolution: &Resolution,
    plans: &DecodePlans<'_>,
    ty: &str,
    payload: &str,
) -> miette::Result<()> {
    let text = std::fs::read_to_string(payload).into_diagnostic()?;
    let value: serde_json::Value = serde_json::from_str(&text).into_diagnostic()?;

    let decoded = match resolution.registry.get(ty) {
        Some(ResolvedKind::Struct(_)) => {
            serde_json::to_value(plans.decode_struct(ty, &value)?).into_diagnostic()?
        }
        Some(ResolvedKind::Union(_)) => {
            serde_json::to_value(plans.decode_union(ty, &value)?).into_diagnostic()?
        }
        Some(other) => {
            return Err(miette!(
                "{} resolves to a {} type and has no decode plan",
                ty,
                other.kind_name()
            ));
        }
        None => return Err(miette!("{} is not a resolved type", ty)),
    };

    let pretty = serde_json::to_string_pretty(&decoded).into_diagnostic()?;
    println!("{}", pretty);
    Ok(())
}
