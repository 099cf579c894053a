//! The closed set of diagnostics specter understands.
//!
//! Fixed patterns are compiled once; patterns that embed a probed name are
//! built per call with the name regex-escaped. Matching is deliberately
//! loose about surrounding text so that wording differences between server
//! implementations do not turn into false negatives.

use lazy_static::lazy_static;
use regex::Regex;

/// The GraphQL identifier grammar used in every dynamic pattern.
pub const NAME_PATTERN: &str = "[_A-Za-z][_0-9A-Za-z]*";

/// Server-side meta fields that never count as discoveries.
const IGNORED_FIELDS: [&str; 2] = ["__type", "__schema"];

lazy_static! {
    static ref NAME: Regex = Regex::new(NAME_PATTERN).expect("name pattern");
    static ref NON_ENUM_VALUE: Regex =
        Regex::new(r#"Enum "[^"]+" cannot represent non-enum value: (.*)\."#)
            .expect("non-enum-value pattern");
    static ref DID_YOU_MEAN: Regex =
        Regex::new(r"Did you mean(?: the enum value| to use an inline fragment on)? (.*)\?$")
            .expect("did-you-mean pattern");
    static ref NON_SCALAR_HINT: Regex =
        Regex::new(r"(non-?string)|(non-?integer)|(must be a string)")
            .expect("non-scalar hint pattern");
    static ref ENUM_HINT: Regex = Regex::new(r"\b[Ee]nums?\b").expect("enum hint pattern");
    static ref SCALAR_NAME: Regex =
        Regex::new(r"Int(?:[A-Z]|\b)|[Ii]nteger|[Ss]tring|[Dd]ate[Tt]ime|[Dd]ate|[Tt]ime|URL|URI")
            .expect("scalar name pattern");
    static ref ENUM_NAME: Regex = Regex::new(r"[Ee]num").expect("enum name pattern");
}

fn compile(pattern: String) -> Regex {
    // Dynamic parts are always escaped, so the pattern itself is static
    // and known-good.
    Regex::new(&pattern).expect("probe pattern")
}

/// `Cannot query field "<name>" on type "(<type>)"`. The capture accepts
/// full type strings (`[User]`, `User!`), not just bare identifiers, so
/// list-typed parents parse directly.
pub fn query_field(name: &str) -> Regex {
    compile(format!(
        r#"Cannot query field "{}" on type "([^"]+)""#,
        regex::escape(name)
    ))
}

/// `Field "<name>" ... "<type>" has no subfields`: the probed field is a
/// leaf scalar.
pub fn no_subfields(name: &str) -> Regex {
    compile(format!(
        r#"Field "{}".*"([^"]+)" has no subfields"#,
        regex::escape(name)
    ))
}

/// `Field "<name>" of type "<type>"`, reported when a composite field is
/// selected without a subselection.
pub fn field_of_type(name: &str) -> Regex {
    compile(format!(
        r#"Field "{}" of type "([^"]+)""#,
        regex::escape(name)
    ))
}

/// `Field "<name>" argument "<arg>" of type "<type>" is required`.
pub fn required_arg(name: &str) -> Regex {
    compile(format!(
        r#"Field "{}" argument "({})" of type "([^"]+)" is required"#,
        regex::escape(name),
        NAME_PATTERN
    ))
}

/// `Field "<type>.<field>" of required type "<type>" was not provided`.
/// Some servers drop the quotes, hence the optional `"` matching.
pub fn required_arg_field(type_name: &str) -> Regex {
    compile(format!(
        r#"Field "?{}\.({})"? of required type "?(.*?)"? was not provided"#,
        regex::escape(type_name),
        NAME_PATTERN
    ))
}

/// `Field "<name>" is not defined by <type>`: unknown input-object field.
pub fn field_not_defined(name: &str) -> Regex {
    compile(format!(
        r#"Field "{}" is not defined by {}"#,
        regex::escape(name),
        NAME_PATTERN
    ))
}

/// `Expected type <type>, found <value>`.
pub fn expected_type(name: &str) -> Regex {
    compile(format!(
        "Expected type ([^,]+), found {}",
        regex::escape(name)
    ))
}

/// `Variable "$<var>" of type "<declared>" used in position expecting type
/// "<actual>"`, the coercion error that leaks an argument's true type.
pub fn expecting_type(variable: &str, declared_type: &str) -> Regex {
    compile(format!(
        r#"Variable "\${}" of type "{}" used in position expecting type "([^"]+)""#,
        regex::escape(variable),
        regex::escape(declared_type)
    ))
}

/// `Value "<value>" does not exist in "<enum>" enum`.
pub fn enum_not_exists(name: &str, enum_type: &str) -> Regex {
    let enum_part = if enum_type.is_empty() {
        r#"[^"]+"#.to_string()
    } else {
        regex::escape(enum_type)
    };
    compile(format!(
        r#"Value "{}" does not exist in "{}" enum"#,
        regex::escape(name),
        enum_part
    ))
}

/// `Unknown argument "<name>"`.
pub fn unknown_arg(name: &str) -> Regex {
    compile(format!(r#"Unknown argument "{}""#, regex::escape(name)))
}

/// Secondary check for argument probes: a diagnostic that names the probed
/// argument at all (`argument "<name>"`) means the argument exists even
/// though `Unknown argument` did not fire.
pub fn exact_arg(name: &str) -> Regex {
    compile(format!(r#"[Aa]rgument "{}""#, regex::escape(name)))
}

pub fn non_enum_value(message: &str) -> Option<&str> {
    NON_ENUM_VALUE
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Identifier tokens from a `Did you mean …?` suggestion list, with
/// ` or ` separators normalised and meta fields dropped.
pub fn suggestions(message: &str) -> Vec<String> {
    let Some(caps) = DID_YOU_MEAN.captures(message) else {
        return Vec::new();
    };
    let list = caps[1].replace(" or ", " ");

    NAME.find_iter(&list)
        .map(|m| m.as_str().to_string())
        .filter(|name| !IGNORED_FIELDS.contains(&name.as_str()))
        .collect()
}

pub fn mentions_inline_fragment(message: &str) -> bool {
    message.contains("inline fragment")
}

/// Scalar-looking type names (`Int`, `BigInteger`, `DateTime`, `URL`, …).
pub fn scalar_like_name(name: &str) -> bool {
    SCALAR_NAME.is_match(name)
}

/// Enum-looking type names (`OrderEnum`, …).
pub fn enum_like_name(name: &str) -> bool {
    ENUM_NAME.is_match(name)
}

/// Secondary kind inference over free-form messages.
pub fn hints_enum(message: &str) -> bool {
    ENUM_HINT.is_match(message)
}

pub fn hints_non_scalar_value(message: &str) -> bool {
    NON_SCALAR_HINT.is_match(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_field_captures_wrapped_types() {
        let re = query_field("specter_field");
        let caps = re
            .captures(r#"Cannot query field "specter_field" on type "[User]"."#)
            .unwrap();
        assert_eq!(&caps[1], "[User]");

        let caps = re
            .captures(r#"Cannot query field "specter_field" on type "RootQuery"."#)
            .unwrap();
        assert_eq!(&caps[1], "RootQuery");
    }

    #[test]
    fn names_are_escaped_into_patterns() {
        // A word with regex metacharacters must not panic or mismatch.
        let re = query_field("weird.name");
        assert!(re.is_match(r#"Cannot query field "weird.name" on type "X""#));
        assert!(!re.is_match(r#"Cannot query field "weirdXname" on type "X""#));
    }

    #[test]
    fn suggestion_lists_are_tokenised() {
        let found = suggestions(r#"Cannot query field "nam" on type "User". Did you mean "name" or "names"?"#);
        assert_eq!(found, vec!["name".to_string(), "names".to_string()]);

        let found = suggestions(
            r#"Did you mean to use an inline fragment on "Person" or "Company"?"#,
        );
        assert_eq!(found, vec!["Person".to_string(), "Company".to_string()]);

        let found =
            suggestions(r#"Cannot query field "x" on type "Query". Did you mean "__schema"?"#);
        assert!(found.is_empty());

        assert!(suggestions("Cannot query field \"x\" on type \"Query\".").is_empty());
    }

    #[test]
    fn enum_suggestions_include_the_enum_value_wording() {
        let found = suggestions(
            r#"Value "FOO" does not exist in "SearchKind" enum. Did you mean the enum value "USERS" or "POSTS"?"#,
        );
        assert_eq!(found, vec!["USERS".to_string(), "POSTS".to_string()]);
    }

    #[test]
    fn required_input_patterns_capture_name_and_type() {
        let re = required_arg("search");
        let caps = re
            .captures(r#"Field "search" argument "kind" of type "SearchKind!" is required, but it was not provided."#)
            .unwrap();
        assert_eq!(&caps[1], "kind");
        assert_eq!(&caps[2], "SearchKind!");

        let re = required_arg_field("SearchFilter");
        let caps = re
            .captures(r#"Field "SearchFilter.term" of required type "String!" was not provided."#)
            .unwrap();
        assert_eq!(&caps[1], "term");
        assert_eq!(&caps[2], "String!");

        // Unquoted variant.
        let caps = re
            .captures("Field SearchFilter.term of required type String! was not provided.")
            .unwrap();
        assert_eq!(&caps[1], "term");
    }

    #[test]
    fn variable_coercion_pattern_escapes_the_declared_type() {
        let re = expecting_type("kind", "[Boolean!]!");
        let caps = re
            .captures(r#"Variable "$kind" of type "[Boolean!]!" used in position expecting type "SearchKind!"."#)
            .unwrap();
        assert_eq!(&caps[1], "SearchKind!");
    }

    #[test]
    fn kind_inference_heuristics() {
        assert!(scalar_like_name("BigInteger"));
        assert!(scalar_like_name("DateTime"));
        assert!(scalar_like_name("Int"));
        assert!(scalar_like_name("IntValue"));
        assert!(!scalar_like_name("User"));

        assert!(enum_like_name("OrderEnum"));
        assert!(!enum_like_name("User"));

        assert!(hints_enum("this value must be an enum"));
        assert!(hints_non_scalar_value("got a non-string value"));
        assert!(hints_non_scalar_value("value must be a string"));
    }

    #[test]
    fn non_enum_value_extracts_the_embedded_input() {
        let embedded = non_enum_value(
            r#"Enum "SearchKind" cannot represent non-enum value: {kind: specter_arg_field}."#,
        )
        .unwrap();
        assert!(embedded.contains("kind: specter_arg_field"));
    }
}
