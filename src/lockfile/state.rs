use crate::address::ProviderAddress;
use crate::lockfile::document::LockDocument;
use crate::lockfile::errors::LockFileError;
use crate::lockfile::locator::BlockHandle;
use hcl_edit::expr::Expression;
use hcl_edit::structure::{Attribute, Body};

/// What a provider block currently records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderBlockState {
    pub address: ProviderAddress,
    pub version: String,
    pub constraints: Option<String>,
    /// In document order
    pub hashes: Vec<String>,
}

/// Read version, constraints and hashes from a located block.
pub fn extract(document: &LockDocument, handle: &BlockHandle) -> Result<ProviderBlockState, LockFileError> {
    let address = handle.address().to_string();
    let block = document
        .parsed_block(handle.index())
        .ok_or_else(|| LockFileError::ProviderBlockNotFound {
            address: address.clone(),
            file: document.path().display().to_string(),
        })?;

    let version = find_attribute(&block.body, "version")
        .ok_or_else(|| LockFileError::MissingAttribute {
            address: address.clone(),
            attribute: "version",
        })
        .and_then(|attr| string_value(&address, "version", &attr.value))?;

    let constraints = find_attribute(&block.body, "constraints")
        .map(|attr| string_value(&address, "constraints", &attr.value))
        .transpose()?;

    let hashes = match find_attribute(&block.body, "hashes") {
        Some(attr) => string_list(&address, &attr.value)?,
        None => Vec::new(),
    };

    Ok(ProviderBlockState {
        address: handle.address().clone(),
        version,
        constraints,
        hashes,
    })
}

fn find_attribute<'a>(body: &'a Body, key: &str) -> Option<&'a Attribute> {
    body.iter()
        .filter_map(|structure| structure.as_attribute())
        .find(|attr| attr.key.value().as_str() == key)
}

fn string_value(address: &str, attribute: &'static str, expr: &Expression) -> Result<String, LockFileError> {
    match expr {
        Expression::String(value) => Ok(value.value().clone()),
        other => Err(LockFileError::UnsupportedExpression {
            address: address.to_string(),
            attribute,
            expected: "string literal",
            found: expression_kind(other),
        }),
    }
}

fn string_list(address: &str, expr: &Expression) -> Result<Vec<String>, LockFileError> {
    match expr {
        Expression::Array(array) => array
            .iter()
            .map(|item| string_value(address, "hashes", item))
            .collect(),
        other => Err(LockFileError::UnsupportedExpression {
            address: address.to_string(),
            attribute: "hashes",
            expected: "list of string literals",
            found: expression_kind(other),
        }),
    }
}

fn expression_kind(expr: &Expression) -> &'static str {
    match expr {
        Expression::Null(_) => "null",
        Expression::Bool(_) => "bool",
        Expression::Number(_) => "number",
        Expression::String(_) => "string",
        Expression::Array(_) => "list",
        Expression::Object(_) => "object",
        Expression::StringTemplate(_) => "string template",
        Expression::HeredocTemplate(_) => "heredoc",
        _ => "expression",
    }
}
