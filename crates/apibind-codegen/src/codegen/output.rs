use crate::error::{CodegenError, Result};
use proc_macro2::TokenStream;
use quote::quote;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::CodeGenerator;

impl<'r> CodeGenerator<'r> {
    /// Generate all code, organized by file path relative to the output directory
    pub fn generate_all(&self) -> Result<BTreeMap<PathBuf, TokenStream>> {
        let mut files = BTreeMap::new();
        files.insert(PathBuf::from("types.rs"), self.generate_types());
        files.insert(PathBuf::from("decode.rs"), self.generate_decoders()?);
        files.insert(
            PathBuf::from("mod.rs"),
            quote! {
                mod decode;
                pub mod types;

                pub use types::*;
            },
        );
        Ok(files)
    }

    /// Format every generated file, header included
    pub fn render_all(&self) -> Result<BTreeMap<PathBuf, String>> {
        let mut rendered = BTreeMap::new();
        for (path, tokens) in self.generate_all()? {
            let text = self.render(&path, tokens)?;
            rendered.insert(path, text);
        }
        Ok(rendered)
    }

    fn render(&self, path: &Path, tokens: TokenStream) -> Result<String> {
        let file: syn::File = syn::parse2(tokens).map_err(|source| CodegenError::FormatError {
            path: path.to_path_buf(),
            source,
        })?;
        let formatted = prettyplease::unparse(&file);

        // Add blank lines between top-level items for better readability
        let lines: Vec<&str> = formatted.lines().collect();
        let mut result_lines = Vec::new();

        for (i, line) in lines.iter().enumerate() {
            result_lines.push(*line);

            // Add blank line after closing braces that are at column 0 (top-level items)
            if *line == "}" && i + 1 < lines.len() && !lines[i + 1].is_empty() {
                result_lines.push("");
            }

            // Add blank line after the module declarations
            if line.ends_with(';') && (line.starts_with("mod ") || line.starts_with("pub mod ")) {
                if let Some(next_line) = lines.get(i + 1) {
                    if !next_line.contains("mod ") && !next_line.is_empty() {
                        result_lines.push("");
                    }
                }
            }
        }

        let mut body = result_lines.join("\n");
        body.push('\n');

        let header = match &self.schema_version {
            Some(version) => format!(
                "// @generated by apibind-codegen. DO NOT EDIT.\n//\n// Schema: {}\n//\n// This file was automatically generated from an API schema.\n// Any manual changes will be overwritten on the next regeneration.\n\n",
                version
            ),
            None => "// @generated by apibind-codegen. DO NOT EDIT.\n//\n// This file was automatically generated from an API schema.\n// Any manual changes will be overwritten on the next regeneration.\n\n".to_string(),
        };
        Ok(format!("{}{}", header, body))
    }

    /// Write all generated code to disk, returning the written paths
    pub fn write_to_disk(&self, output_dir: &Path) -> Result<Vec<PathBuf>> {
        let rendered = self.render_all()?;

        std::fs::create_dir_all(output_dir).map_err(|e| CodegenError::Other {
            message: format!("Failed to create directory {:?}: {}", output_dir, e),
            source: Some(Box::new(e)),
        })?;

        let mut written = Vec::with_capacity(rendered.len());
        for (path, text) in rendered {
            let full_path = output_dir.join(&path);
            std::fs::write(&full_path, text).map_err(|e| CodegenError::Other {
                message: format!("Failed to write file {:?}: {}", full_path, e),
                source: Some(Box::new(e)),
            })?;
            tracing::debug!(path = %full_path.display(), "wrote generated file");
            written.push(full_path);
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use crate::codegen::CodeGenerator;
    use crate::decode::DecodePlans;
    use crate::overrides::OverrideTables;
    use crate::resolver::resolve;
    use crate::schema::Schema;

    #[test]
    fn test_write_to_disk() {
        let schema = Schema::load_from_file("tests/fixtures/schema.json").expect("load schema");
        let overrides =
            OverrideTables::load_from_file("tests/fixtures/overrides.kdl").expect("load overrides");
        let resolution = resolve(&schema, &overrides).expect("resolution");
        let plans = DecodePlans::build(&resolution.registry, &overrides).expect("plans");
        let codegen = CodeGenerator::new(&resolution, &plans, &overrides)
            .with_schema_version(Some("Fixture 1.0".to_string()));

        let dir = tempfile::tempdir().expect("tempdir");
        let written = codegen.write_to_disk(dir.path()).expect("write");
        assert_eq!(written.len(), 3);

        let types = std::fs::read_to_string(dir.path().join("types.rs")).expect("types.rs");
        assert!(types.starts_with("// @generated by apibind-codegen. DO NOT EDIT."));
        assert!(types.contains("// Schema: Fixture 1.0"));
        assert!(types.contains("pub struct Owner"));

        let module = std::fs::read_to_string(dir.path().join("mod.rs")).expect("mod.rs");
        assert!(module.contains("mod decode;"));
        assert!(module.contains("pub use types::*;"));

        let decode = std::fs::read_to_string(dir.path().join("decode.rs")).expect("decode.rs");
        assert!(decode.contains("use super::types::*;"));
    }

    #[test]
    fn test_render_is_stable() {
        let schema = Schema::load_from_file("tests/fixtures/schema.json").expect("load schema");
        let overrides =
            OverrideTables::load_from_file("tests/fixtures/overrides.kdl").expect("load overrides");

        let render = || {
            let resolution = resolve(&schema, &overrides).expect("resolution");
            let plans = DecodePlans::build(&resolution.registry, &overrides).expect("plans");
            CodeGenerator::new(&resolution, &plans, &overrides)
                .render_all()
                .expect("render")
        };

        assert_eq!(render(), render());
    }
}
