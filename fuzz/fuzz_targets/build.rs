#![no_main]
use libfuzzer_sys::fuzz_target;
use shapecheck::Schema;

fn has_invalid(schema: &Schema) -> bool {
    match schema {
        Schema::Invalid(_) => true,
        Schema::Primitive(_) => false,
        Schema::Meta(meta) => has_invalid(&meta.type_),
        Schema::Array(inner) | Schema::Dynamic(inner) => has_invalid(inner),
        Schema::Or(left, right) | Schema::And(left, right) => has_invalid(left) || has_invalid(right),
        Schema::Hierarchy(fields) => fields.iter().any(|(_, field)| has_invalid(field)),
    }
}

fuzz_target!(|data: &[u8]| {
    if let Ok(literal) = serde_json::from_slice::<serde_json::Value>(data) {
        let schema = shapecheck::build(&literal);
        assert_eq!(shapecheck::is_schema(&literal), !has_invalid(&schema));
    }
});
