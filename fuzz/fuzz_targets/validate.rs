#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|schema_and_instance: (Vec<u8>, Vec<u8>)| {
    let validator = shapecheck::Validator::new()
        .with_options(shapecheck::ValidateOptions::new().with_max_depth(64));

    let literal: serde_json::Value = match serde_json::from_slice(&schema_and_instance.0) {
        Ok(literal) => literal,
        Err(_) => return,
    };

    // We're only interested in fuzzing against valid schemas.
    let schema = shapecheck::build(&literal);
    if validator.check_schema(&schema).is_err() {
        return;
    }

    if let Ok(instance) = serde_json::from_slice::<serde_json::Value>(&schema_and_instance.1) {
        let instance = shapecheck::Value::from(instance);
        if let Ok(model) = validator.validate(&schema, &instance) {
            assert!(validator.validate(&schema, &model).is_ok());
        }
    }
});
