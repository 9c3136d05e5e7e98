//! Input validation for values handed to AWS APIs

use regex::Regex;
use std::sync::OnceLock;

struct PatternValidator {
    pattern: &'static str,
    description: &'static str,
}

impl PatternValidator {
    fn validate(
        &self,
        cell: &OnceLock<Result<Regex, regex::Error>>,
        attribute: &str,
        value: &str,
    ) -> Result<(), String> {
        let pattern = cell
            .get_or_init(|| Regex::new(self.pattern))
            .as_ref()
            .map_err(|e| format!("invalid {} pattern: {}", attribute, e))?;
        if pattern.is_match(value) {
            Ok(())
        } else {
            Err(format!(
                "{} must match {} (got '{}')",
                attribute, self.description, value
            ))
        }
    }
}

const REGION: PatternValidator = PatternValidator {
    pattern: r"^[a-z]{2}(-[a-z]+)+-\d+$",
    description: "an AWS region such as us-east-1",
};

const TYPE_NAME: PatternValidator = PatternValidator {
    pattern: r"^[A-Za-z0-9]{2,64}::[A-Za-z0-9]{2,64}::[A-Za-z0-9]{2,64}$",
    description: "a resource type such as AWS::Logs::LogGroup",
};

pub fn validate_region(region: &str) -> Result<(), String> {
    static CELL: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    REGION.validate(&CELL, "region", region)
}

pub fn validate_type_name(type_name: &str) -> Result<(), String> {
    static CELL: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    TYPE_NAME.validate(&CELL, "type_name", type_name)
}
