//! Fuzz target for the model snapshot loader.
//!
//! Arbitrary bytes must never panic `load_model`; a loaded model must report a
//! consistent object count and yield one registry entry per scope.

#![no_main]

use libfuzzer_sys::fuzz_target;

use modelbpa_domain::ScopeRegistry;
use modelbpa_model::load_model;
use modelbpa_types::ScopeName;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(model) = load_model(text) else {
        return;
    };

    let registry = ScopeRegistry::for_model(&model);
    let mut collected = 0usize;
    for scope in ScopeName::ALL {
        let entry = registry.lookup(scope).expect("every scope is registered");
        for object in entry.collect() {
            assert_eq!(object.scope(), scope);
            let _ = entry.name(&object);
            collected += 1;
        }
    }
    assert_eq!(collected, model.object_count());
});
