//! Introspection: a serializable snapshot of a module tree.
//!
//! Each function's input and output schema is paired with a model alias of
//! the module that owns the function, when one of that module's declared
//! models is structurally equal (same canonical form). Aliases never leak
//! across modules: a sibling or child declaring the same schema does not
//! lend its name.

use serde::{Deserialize, Serialize};

use crate::module::Module;
use crate::schema::Schema;

/// The whole namespace as one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub version: String,
    pub root: ModuleDescription,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDescription {
    pub name: String,
    pub functions: Vec<FunctionDescription>,
    pub models: Vec<ModelDescription>,
    pub submodules: Vec<ModuleDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescription {
    pub name: String,
    pub schema: Schema,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDescription {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input: Schema,
    pub output: Schema,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_alias_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_alias_name: Option<String>,
}

impl Document {
    /// Describe `root` and everything below it. Never mutates the tree, so
    /// repeated calls on the same tree produce equal documents.
    pub fn from_module(
        root: &Module,
        title: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            root: ModuleDescription::from_module(root),
        }
    }

    /// Every function in resolution order, with the first occurrence of a
    /// name winning over later (shadowed) ones.
    pub fn reachable_functions(&self) -> Vec<&FunctionDescription> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        self.root.walk(&mut |module| {
            for function in &module.functions {
                if seen.insert(function.name.as_str()) {
                    out.push(function);
                }
            }
        });
        out
    }
}

impl ModuleDescription {
    pub fn from_module(module: &Module) -> Self {
        let models: Vec<ModelDescription> = module
            .models()
            .map(|(name, schema)| ModelDescription {
                name: name.to_string(),
                schema: schema.clone(),
            })
            .collect();

        let functions = module
            .endpoints()
            .map(|endpoint| FunctionDescription {
                name: endpoint.name().to_string(),
                summary: endpoint.summary_text().map(str::to_string),
                description: endpoint.description_text().map(str::to_string),
                input: endpoint.input().clone(),
                output: endpoint.output().clone(),
                input_alias_name: alias_for(&models, endpoint.input()),
                output_alias_name: alias_for(&models, endpoint.output()),
            })
            .collect();

        Self {
            name: module.name().to_string(),
            functions,
            models,
            submodules: module
                .submodules()
                .iter()
                .map(ModuleDescription::from_module)
                .collect(),
        }
    }

    /// Pre-order traversal: this module, then each submodule in order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a ModuleDescription)) {
        visit(self);
        for child in &self.submodules {
            child.walk(visit);
        }
    }
}

fn alias_for(models: &[ModelDescription], schema: &Schema) -> Option<String> {
    models
        .iter()
        .find(|model| model.schema.canonical() == schema.canonical())
        .map(|model| model.name.clone())
}
