//! Built-in vocabulary definitions for drafts 2019-09 and 2020-12.
//!
//! One static [`KeywordSpec`] per keyword binding; the per-draft vocabulary
//! sets below are the single source of truth for which keyword names are
//! active under which metaschema.

use crate::catalog::Catalog;
use crate::error::CatalogError;
use crate::json::JsonType;
use crate::keywords::{annotation, applicator, core, format, legacy, unevaluated, validation};
use crate::source::EmbeddedSource;
use crate::uri::Uri;
use crate::vocabulary::{Draft, KeywordSpec};

const OBJECT: Option<&[JsonType]> = Some(&[JsonType::Object]);
const ARRAY: Option<&[JsonType]> = Some(&[JsonType::Array]);
const NUMBER: Option<&[JsonType]> = Some(&[JsonType::Number]);
const STRING: Option<&[JsonType]> = Some(&[JsonType::String]);

macro_rules! specs {
    ($($name:ident: { $key:literal, $factory:path, deps: $deps:expr, types: $types:expr, static: $static_:expr }),* $(,)?) => {
        $(static $name: KeywordSpec = KeywordSpec {
            name: $key,
            depends_on: $deps,
            instance_types: $types,
            compile_only: $static_,
            factory: $factory,
        };)*
    };
}

specs! {
    // -- core ---------------------------------------------------------------
    SCHEMA: { "$schema", core::static_factory, deps: &[], types: None, static: true },
    VOCABULARY: { "$vocabulary", core::static_factory, deps: &[], types: None, static: true },
    ID: { "$id", core::static_factory, deps: &[], types: None, static: true },
    ANCHOR: { "$anchor", core::static_factory, deps: &[], types: None, static: true },
    DYNAMIC_ANCHOR: { "$dynamicAnchor", core::static_factory, deps: &[], types: None, static: true },
    RECURSIVE_ANCHOR: { "$recursiveAnchor", core::static_factory, deps: &[], types: None, static: true },
    COMMENT: { "$comment", core::static_factory, deps: &[], types: None, static: true },
    DEFS: { "$defs", core::defs_factory, deps: &[], types: None, static: true },
    REF: { "$ref", core::ref_factory, deps: &[], types: None, static: false },
    DYNAMIC_REF: { "$dynamicRef", core::dynamic_ref_factory, deps: &[], types: None, static: false },
    RECURSIVE_REF: { "$recursiveRef", core::recursive_ref_factory, deps: &[], types: None, static: false },

    // -- applicator ---------------------------------------------------------
    ALL_OF: { "allOf", applicator::all_of_factory, deps: &[], types: None, static: false },
    ANY_OF: { "anyOf", applicator::any_of_factory, deps: &[], types: None, static: false },
    ONE_OF: { "oneOf", applicator::one_of_factory, deps: &[], types: None, static: false },
    NOT: { "not", applicator::not_factory, deps: &[], types: None, static: false },
    IF: { "if", applicator::if_factory, deps: &[], types: None, static: false },
    THEN: { "then", applicator::then_factory, deps: &["if"], types: None, static: false },
    ELSE: { "else", applicator::else_factory, deps: &["if"], types: None, static: false },
    DEPENDENT_SCHEMAS: { "dependentSchemas", applicator::dependent_schemas_factory, deps: &[], types: OBJECT, static: false },
    PREFIX_ITEMS: { "prefixItems", applicator::prefix_items_factory, deps: &[], types: ARRAY, static: false },
    ITEMS: { "items", applicator::items_factory, deps: &["prefixItems"], types: ARRAY, static: false },
    LEGACY_ITEMS: { "items", legacy::legacy_items_factory, deps: &[], types: ARRAY, static: false },
    ADDITIONAL_ITEMS: { "additionalItems", legacy::additional_items_factory, deps: &["items"], types: ARRAY, static: false },
    CONTAINS: { "contains", applicator::contains_factory, deps: &[], types: ARRAY, static: false },
    PROPERTIES: { "properties", applicator::properties_factory, deps: &[], types: OBJECT, static: false },
    PATTERN_PROPERTIES: { "patternProperties", applicator::pattern_properties_factory, deps: &[], types: OBJECT, static: false },
    ADDITIONAL_PROPERTIES: { "additionalProperties", applicator::additional_properties_factory, deps: &["properties", "patternProperties"], types: OBJECT, static: false },
    PROPERTY_NAMES: { "propertyNames", applicator::property_names_factory, deps: &[], types: OBJECT, static: false },

    // -- unevaluated --------------------------------------------------------
    UNEVALUATED_ITEMS: { "unevaluatedItems", unevaluated::unevaluated_items_factory,
        deps: &["prefixItems", "items", "contains", "if", "then", "else", "allOf", "anyOf", "oneOf", "not", "$ref", "$dynamicRef"],
        types: ARRAY, static: false },
    LEGACY_UNEVALUATED_ITEMS: { "unevaluatedItems", unevaluated::legacy_unevaluated_items_factory,
        deps: &["items", "additionalItems", "if", "then", "else", "allOf", "anyOf", "oneOf", "not", "$ref", "$recursiveRef"],
        types: ARRAY, static: false },
    UNEVALUATED_PROPERTIES: { "unevaluatedProperties", unevaluated::unevaluated_properties_factory,
        deps: &["properties", "patternProperties", "additionalProperties", "if", "then", "else", "dependentSchemas", "allOf", "anyOf", "oneOf", "not", "$ref", "$dynamicRef"],
        types: OBJECT, static: false },
    LEGACY_UNEVALUATED_PROPERTIES: { "unevaluatedProperties", unevaluated::unevaluated_properties_factory,
        deps: &["properties", "patternProperties", "additionalProperties", "if", "then", "else", "dependentSchemas", "allOf", "anyOf", "oneOf", "not", "$ref", "$recursiveRef"],
        types: OBJECT, static: false },

    // -- validation ---------------------------------------------------------
    TYPE: { "type", validation::type_factory, deps: &[], types: None, static: false },
    ENUM: { "enum", validation::enum_factory, deps: &[], types: None, static: false },
    CONST: { "const", validation::const_factory, deps: &[], types: None, static: false },
    MULTIPLE_OF: { "multipleOf", validation::multiple_of_factory, deps: &[], types: NUMBER, static: false },
    MAXIMUM: { "maximum", validation::maximum_factory, deps: &[], types: NUMBER, static: false },
    EXCLUSIVE_MAXIMUM: { "exclusiveMaximum", validation::exclusive_maximum_factory, deps: &[], types: NUMBER, static: false },
    MINIMUM: { "minimum", validation::minimum_factory, deps: &[], types: NUMBER, static: false },
    EXCLUSIVE_MINIMUM: { "exclusiveMinimum", validation::exclusive_minimum_factory, deps: &[], types: NUMBER, static: false },
    MAX_LENGTH: { "maxLength", validation::max_length_factory, deps: &[], types: STRING, static: false },
    MIN_LENGTH: { "minLength", validation::min_length_factory, deps: &[], types: STRING, static: false },
    PATTERN: { "pattern", validation::pattern_factory, deps: &[], types: STRING, static: false },
    MAX_ITEMS: { "maxItems", validation::max_items_factory, deps: &[], types: ARRAY, static: false },
    MIN_ITEMS: { "minItems", validation::min_items_factory, deps: &[], types: ARRAY, static: false },
    UNIQUE_ITEMS: { "uniqueItems", validation::unique_items_factory, deps: &[], types: ARRAY, static: false },
    MAX_CONTAINS: { "maxContains", validation::max_contains_factory, deps: &["contains"], types: ARRAY, static: false },
    MIN_CONTAINS: { "minContains", validation::min_contains_factory, deps: &["contains", "maxContains"], types: ARRAY, static: false },
    MAX_PROPERTIES: { "maxProperties", validation::max_properties_factory, deps: &[], types: OBJECT, static: false },
    MIN_PROPERTIES: { "minProperties", validation::min_properties_factory, deps: &[], types: OBJECT, static: false },
    REQUIRED: { "required", validation::required_factory, deps: &[], types: OBJECT, static: false },
    DEPENDENT_REQUIRED: { "dependentRequired", validation::dependent_required_factory, deps: &[], types: OBJECT, static: false },

    // -- meta-data ----------------------------------------------------------
    TITLE: { "title", annotation::annotation_factory, deps: &[], types: None, static: false },
    DESCRIPTION: { "description", annotation::annotation_factory, deps: &[], types: None, static: false },
    DEFAULT: { "default", annotation::annotation_factory, deps: &[], types: None, static: false },
    DEPRECATED: { "deprecated", annotation::annotation_factory, deps: &[], types: None, static: false },
    READ_ONLY: { "readOnly", annotation::annotation_factory, deps: &[], types: None, static: false },
    WRITE_ONLY: { "writeOnly", annotation::annotation_factory, deps: &[], types: None, static: false },
    EXAMPLES: { "examples", annotation::annotation_factory, deps: &[], types: None, static: false },

    // -- format -------------------------------------------------------------
    FORMAT: { "format", format::format_factory, deps: &[], types: None, static: false },

    // -- content ------------------------------------------------------------
    CONTENT_MEDIA_TYPE: { "contentMediaType", annotation::annotation_factory, deps: &[], types: STRING, static: false },
    CONTENT_ENCODING: { "contentEncoding", annotation::annotation_factory, deps: &[], types: STRING, static: false },
    CONTENT_SCHEMA: { "contentSchema", annotation::content_schema_factory, deps: &["contentMediaType"], types: STRING, static: false },
}

fn uri(text: &str) -> Uri {
    Uri::parse(text).expect("built-in vocabulary URIs are valid")
}

/// Register the draft's vocabularies and its embedded metaschema documents.
pub(crate) fn register(catalog: &mut Catalog, draft: Draft) -> Result<(), CatalogError> {
    match draft {
        Draft::V2020_12 => register_2020_12(catalog),
        Draft::V2019_09 => register_2019_09(catalog),
    }
}

fn register_2020_12(catalog: &mut Catalog) -> Result<(), CatalogError> {
    catalog.add_uri_source(
        Some(&uri("https://json-schema.org/draft/2020-12/")),
        EmbeddedSource {
            files: FILES_2020_12,
        },
    )?;
    catalog.create_vocabulary(
        uri("https://json-schema.org/draft/2020-12/vocab/core"),
        vec![
            &SCHEMA, &VOCABULARY, &ID, &ANCHOR, &DYNAMIC_ANCHOR, &DYNAMIC_REF, &REF, &DEFS,
            &COMMENT,
        ],
    );
    catalog.create_vocabulary(
        uri("https://json-schema.org/draft/2020-12/vocab/applicator"),
        vec![
            &ALL_OF, &ANY_OF, &ONE_OF, &NOT, &IF, &THEN, &ELSE, &DEPENDENT_SCHEMAS,
            &PREFIX_ITEMS, &ITEMS, &CONTAINS, &PROPERTIES, &PATTERN_PROPERTIES,
            &ADDITIONAL_PROPERTIES, &PROPERTY_NAMES,
        ],
    );
    catalog.create_vocabulary(
        uri("https://json-schema.org/draft/2020-12/vocab/unevaluated"),
        vec![&UNEVALUATED_ITEMS, &UNEVALUATED_PROPERTIES],
    );
    catalog.create_vocabulary(
        uri("https://json-schema.org/draft/2020-12/vocab/validation"),
        vec![
            &TYPE, &ENUM, &CONST, &MULTIPLE_OF, &MAXIMUM, &EXCLUSIVE_MAXIMUM, &MINIMUM,
            &EXCLUSIVE_MINIMUM, &MAX_LENGTH, &MIN_LENGTH, &PATTERN, &MAX_ITEMS, &MIN_ITEMS,
            &UNIQUE_ITEMS, &MAX_CONTAINS, &MIN_CONTAINS, &MAX_PROPERTIES, &MIN_PROPERTIES,
            &REQUIRED, &DEPENDENT_REQUIRED,
        ],
    );
    catalog.create_vocabulary(
        uri("https://json-schema.org/draft/2020-12/vocab/meta-data"),
        vec![
            &TITLE, &DESCRIPTION, &DEFAULT, &DEPRECATED, &READ_ONLY, &WRITE_ONLY, &EXAMPLES,
        ],
    );
    catalog.create_vocabulary(
        uri("https://json-schema.org/draft/2020-12/vocab/format-annotation"),
        vec![&FORMAT],
    );
    catalog.create_vocabulary(
        uri("https://json-schema.org/draft/2020-12/vocab/content"),
        vec![&CONTENT_MEDIA_TYPE, &CONTENT_ENCODING, &CONTENT_SCHEMA],
    );
    Ok(())
}

fn register_2019_09(catalog: &mut Catalog) -> Result<(), CatalogError> {
    catalog.add_uri_source(
        Some(&uri("https://json-schema.org/draft/2019-09/")),
        EmbeddedSource {
            files: FILES_2019_09,
        },
    )?;
    catalog.create_vocabulary(
        uri("https://json-schema.org/draft/2019-09/vocab/core"),
        vec![
            &SCHEMA, &VOCABULARY, &ID, &ANCHOR, &RECURSIVE_ANCHOR, &RECURSIVE_REF, &REF, &DEFS,
            &COMMENT,
        ],
    );
    catalog.create_vocabulary(
        uri("https://json-schema.org/draft/2019-09/vocab/applicator"),
        vec![
            &ALL_OF, &ANY_OF, &ONE_OF, &NOT, &IF, &THEN, &ELSE, &DEPENDENT_SCHEMAS,
            &LEGACY_ITEMS, &ADDITIONAL_ITEMS, &LEGACY_UNEVALUATED_ITEMS, &CONTAINS, &PROPERTIES,
            &PATTERN_PROPERTIES, &ADDITIONAL_PROPERTIES, &LEGACY_UNEVALUATED_PROPERTIES,
            &PROPERTY_NAMES,
        ],
    );
    catalog.create_vocabulary(
        uri("https://json-schema.org/draft/2019-09/vocab/validation"),
        vec![
            &TYPE, &ENUM, &CONST, &MULTIPLE_OF, &MAXIMUM, &EXCLUSIVE_MAXIMUM, &MINIMUM,
            &EXCLUSIVE_MINIMUM, &MAX_LENGTH, &MIN_LENGTH, &PATTERN, &MAX_ITEMS, &MIN_ITEMS,
            &UNIQUE_ITEMS, &MAX_CONTAINS, &MIN_CONTAINS, &MAX_PROPERTIES, &MIN_PROPERTIES,
            &REQUIRED, &DEPENDENT_REQUIRED,
        ],
    );
    catalog.create_vocabulary(
        uri("https://json-schema.org/draft/2019-09/vocab/meta-data"),
        vec![
            &TITLE, &DESCRIPTION, &DEFAULT, &DEPRECATED, &READ_ONLY, &WRITE_ONLY, &EXAMPLES,
        ],
    );
    catalog.create_vocabulary(
        uri("https://json-schema.org/draft/2019-09/vocab/format"),
        vec![&FORMAT],
    );
    catalog.create_vocabulary(
        uri("https://json-schema.org/draft/2019-09/vocab/content"),
        vec![&CONTENT_MEDIA_TYPE, &CONTENT_ENCODING, &CONTENT_SCHEMA],
    );
    Ok(())
}

static FILES_2020_12: &[(&str, &str)] = &[
    ("schema", include_str!("metaschema/2020-12/schema.json")),
    ("meta/core", include_str!("metaschema/2020-12/core.json")),
    (
        "meta/applicator",
        include_str!("metaschema/2020-12/applicator.json"),
    ),
    (
        "meta/unevaluated",
        include_str!("metaschema/2020-12/unevaluated.json"),
    ),
    (
        "meta/validation",
        include_str!("metaschema/2020-12/validation.json"),
    ),
    (
        "meta/meta-data",
        include_str!("metaschema/2020-12/meta-data.json"),
    ),
    (
        "meta/format-annotation",
        include_str!("metaschema/2020-12/format-annotation.json"),
    ),
    (
        "meta/content",
        include_str!("metaschema/2020-12/content.json"),
    ),
];

static FILES_2019_09: &[(&str, &str)] = &[
    ("schema", include_str!("metaschema/2019-09/schema.json")),
    ("meta/core", include_str!("metaschema/2019-09/core.json")),
    (
        "meta/applicator",
        include_str!("metaschema/2019-09/applicator.json"),
    ),
    (
        "meta/validation",
        include_str!("metaschema/2019-09/validation.json"),
    ),
    (
        "meta/meta-data",
        include_str!("metaschema/2019-09/meta-data.json"),
    ),
    ("meta/format", include_str!("metaschema/2019-09/format.json")),
    (
        "meta/content",
        include_str!("metaschema/2019-09/content.json"),
    ),
];
