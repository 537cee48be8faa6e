// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Connectias Integrity Detector - JNI bindings
//!
//! Exposes the integrity engine to the Kotlin layer as six synchronous calls:
//! five per-category booleans and one status bitmask
//! (bit0 root, bit1 instrumentation, bit2 emulator, bit3 debugger, bit4 tamper tool).
//! No call ever throws into the JVM; an internal fault reads as "not detected".

use std::panic::{self, AssertUnwindSafe};

use connectias_integrity::IntegrityEngine;
use jni::objects::JClass;
use jni::sys::{jboolean, jint, JNI_FALSE, JNI_TRUE};
use jni::JNIEnv;
use log::{debug, warn};
use once_cell::sync::Lazy;

#[cfg(target_os = "android")]
use android_logger::Config;
#[cfg(target_os = "android")]
use log::LevelFilter;

/// Signature tables and probe wiring only; results are never cached
static ENGINE: Lazy<IntegrityEngine> = Lazy::new(IntegrityEngine::default);

/// Run `check`, turning a panic into `fallback`
fn guarded<T>(operation: &str, fallback: T, check: impl FnOnce() -> T) -> T {
    match panic::catch_unwind(AssertUnwindSafe(check)) {
        Ok(value) => value,
        Err(_) => {
            warn!("{} panicked, reporting not detected", operation);
            fallback
        }
    }
}

fn to_jboolean(detected: bool) -> jboolean {
    if detected {
        JNI_TRUE
    } else {
        JNI_FALSE
    }
}

fn is_rooted() -> jboolean {
    to_jboolean(guarded("isRooted", false, || ENGINE.is_rooted()))
}

fn is_instrumentation_detected() -> jboolean {
    to_jboolean(guarded("isInstrumentationDetected", false, || {
        ENGINE.is_instrumentation_detected()
    }))
}

fn is_emulator() -> jboolean {
    to_jboolean(guarded("isEmulator", false, || ENGINE.is_emulator()))
}

fn is_debugger_attached() -> jboolean {
    to_jboolean(guarded("isDebuggerAttached", false, || ENGINE.is_debugger_attached()))
}

fn is_memory_tampered() -> jboolean {
    to_jboolean(guarded("isMemoryTampered", false, || ENGINE.is_memory_tampered()))
}

fn security_status() -> jint {
    guarded("getSecurityStatus", 0, || {
        let report = ENGINE.report();
        if let Ok(json) = report.to_json() {
            debug!("Security report: {}", json);
        }
        report.status.bits() as jint
    })
}

// ============================================================================
// JNI Bindings
// ============================================================================

/// Initialize logging for Android
#[cfg(target_os = "android")]
#[no_mangle]
pub extern "C" fn Java_com_ble1st_connectias_core_security_integrity_RustIntegrityDetector_nativeInit(
    _env: JNIEnv,
    _class: JClass,
) {
    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Info)
            .with_tag("RustIntegrityDetector"),
    );
}

#[cfg(not(target_os = "android"))]
#[no_mangle]
pub extern "C" fn Java_com_ble1st_connectias_core_security_integrity_RustIntegrityDetector_nativeInit(
    _env: JNIEnv,
    _class: JClass,
) {
    let _ = env_logger::try_init();
}

#[no_mangle]
pub extern "C" fn Java_com_ble1st_connectias_core_security_integrity_RustIntegrityDetector_nativeIsRooted(
    _env: JNIEnv,
    _class: JClass,
) -> jboolean {
    is_rooted()
}

#[no_mangle]
pub extern "C" fn Java_com_ble1st_connectias_core_security_integrity_RustIntegrityDetector_nativeIsInstrumentationDetected(
    _env: JNIEnv,
    _class: JClass,
) -> jboolean {
    is_instrumentation_detected()
}

#[no_mangle]
pub extern "C" fn Java_com_ble1st_connectias_core_security_integrity_RustIntegrityDetector_nativeIsEmulator(
    _env: JNIEnv,
    _class: JClass,
) -> jboolean {
    is_emulator()
}

#[no_mangle]
pub extern "C" fn Java_com_ble1st_connectias_core_security_integrity_RustIntegrityDetector_nativeIsDebuggerAttached(
    _env: JNIEnv,
    _class: JClass,
) -> jboolean {
    is_debugger_attached()
}

#[no_mangle]
pub extern "C" fn Java_com_ble1st_connectias_core_security_integrity_RustIntegrityDetector_nativeIsMemoryTampered(
    _env: JNIEnv,
    _class: JClass,
) -> jboolean {
    is_memory_tampered()
}

/// Returns the status bitmask; bits above bit 4 are always zero
#[no_mangle]
pub extern "C" fn Java_com_ble1st_connectias_core_security_integrity_RustIntegrityDetector_nativeGetSecurityStatus(
    _env: JNIEnv,
    _class: JClass,
) -> jint {
    security_status()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guarded_panic_falls_back() {
        assert!(!guarded("test", false, || panic!("boom")));
        assert_eq!(guarded("test", 0, || 7), 7);
    }

    #[test]
    fn test_to_jboolean() {
        assert_eq!(to_jboolean(true), JNI_TRUE);
        assert_eq!(to_jboolean(false), JNI_FALSE);
    }

    #[test]
    fn test_status_uses_only_low_bits() {
        let status = security_status();
        assert!(status >= 0);
        assert_eq!(status & !0b1_1111, 0);
    }

    #[test]
    fn test_booleans_are_jni_values() {
        for value in [
            is_rooted(),
            is_instrumentation_detected(),
            is_emulator(),
            is_debugger_attached(),
            is_memory_tampered(),
        ] {
            assert!(value == JNI_TRUE || value == JNI_FALSE);
        }
    }
}
