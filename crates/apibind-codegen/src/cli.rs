use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate typed Rust bindings from an API schema")]
pub struct CodegenArgs {
    /// Schema JSON file
    #[arg(short = 'i', long)]
    pub input: PathBuf,

    /// Output directory for generated Rust code
    #[arg(short = 'o', long, required_unless_present_any = ["dry_run", "check"])]
    pub output: Option<PathBuf>,

    /// KDL override tables (defaults to the built-in tables)
    #[arg(short = 'c', long)]
    pub overrides: Option<PathBuf>,

    /// Resolve and report without writing any files
    #[arg(long)]
    pub dry_run: bool,

    /// Decode a JSON payload as the given type and print the chosen variants
    #[arg(long, num_args = 2, value_names = ["TYPE", "PAYLOAD"])]
    pub check: Option<Vec<String>>,

    /// Verbose output
    #[arg(short = 'v', long)]
    pub verbose: bool,
}
