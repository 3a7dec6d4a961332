use super::CodeGenerator;
use super::utils::make_ident;
use crate::registry::UnionDescriptor;
use heck::ToSnakeCase;
use smol_str::SmolStr;

/// Enum variant names for the options of a union
///
/// The union name is stripped from the front of each option name when the
/// rest still starts an identifier (`InputMedia` + `InputMediaPhoto` ->
/// `Photo`). If stripping makes two variants collide, full names are used.
pub(super) fn variant_names(union: &str, options: &[SmolStr]) -> Vec<String> {
    let stripped: Vec<String> = options
        .iter()
        .map(|option| match option.strip_prefix(union) {
            Some(rest) if rest.starts_with(|c: char| c.is_ascii_uppercase()) => rest.to_string(),
            _ => option.to_string(),
        })
        .collect();

    let mut seen = std::collections::HashSet::new();
    if stripped.iter().all(|name| seen.insert(name.as_str())) {
        stripped
    } else {
        options.iter().map(|o| o.to_string()).collect()
    }
}

impl<'r> CodeGenerator<'r> {
    /// Emitted name for a registry key
    pub(super) fn type_name(&self, key: &str) -> SmolStr {
        self.registry
            .emitted_name(key)
            .cloned()
            .unwrap_or_else(|| SmolStr::new(key))
    }

    pub(super) fn type_ident(&self, key: &str) -> syn::Ident {
        make_ident(&self.type_name(key))
    }

    /// Emitted option names of a union, in schema order
    pub(super) fn option_names(&self, union: &UnionDescriptor) -> Vec<SmolStr> {
        union.options.iter().map(|o| self.type_name(o)).collect()
    }

    pub(super) fn trait_ident(&self, union: &UnionDescriptor) -> syn::Ident {
        make_ident(&format!("{}Option", union.name))
    }

    /// `as_<option>`, with the accessor prefix for synthesized unions
    pub(super) fn accessor_ident(&self, union: &UnionDescriptor, option: &str) -> syn::Ident {
        let option = option.to_snake_case();
        match &union.accessor_prefix {
            Some(prefix) => make_ident(&format!("as_{}_{}", prefix, option)),
            None => make_ident(&format!("as_{}", option)),
        }
    }

    pub(super) fn shadow_ident(&self, union_key: &str) -> syn::Ident {
        make_ident(&format!("{}Shadow", self.type_name(union_key)))
    }

    pub(super) fn decode_fn_ident(&self, union_key: &str) -> syn::Ident {
        make_ident(&format!("decode_{}", self.type_name(union_key).to_snake_case()))
    }

    pub(super) fn raw_ident(&self, struct_key: &str) -> syn::Ident {
        make_ident(&format!("{}Raw", self.type_name(struct_key)))
    }
}

/// Field identifier and the payload name when the two differ
pub(super) fn field_ident(name: &str) -> (syn::Ident, Option<String>) {
    let snake = name.to_snake_case();
    let rename = (snake != name).then(|| name.to_string());
    (make_ident(&snake), rename)
}
