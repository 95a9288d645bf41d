#![no_main]

use libfuzzer_sys::fuzz_target;
use spherical_construction::core::Formula;

fuzz_target!(|data: &[u8]| {
    if let Ok(source) = std::str::from_utf8(data) {
        if let Ok(formula) = Formula::parse(source) {
            let _ = formula.evaluate(0.5, &|_name: &str| Some(1.0));
            let derivative = formula.derivative();
            let _ = derivative.evaluate(0.5, &|_name: &str| Some(1.0));
            // Die ausgegebene Ableitung muss selbst wieder eine gültige Formel sein
            assert!(Formula::parse(derivative.source()).is_ok());
        }
    }
});
