// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Static signature tables.
//!
//! Pure data: every probe reads its defaults from here through
//! [`crate::config::EngineConfig::default`]. Adding a signature never
//! touches probe logic.

/// Superuser binaries (from RootBeer and field reports)
pub const SU_PATHS: &[&str] = &[
    "/system/bin/su",
    "/system/xbin/su",
    "/sbin/su",
    "/data/local/su",
    "/data/local/bin/su",
    "/data/local/xbin/su",
    "/su/bin/su",
    "/system/bin/.ext/su",
    "/system/bin/failsafe/su",
    "/system/sd/xbin/su",
    "/system/usr/we-need-root/su",
    "/cache/su",
    "/data/su",
    "/dev/su",
    "/product/bin/su",
    "/apex/com.android.runtime/bin/su",
    "/apex/com.android.art/bin/su",
    "/system_ext/bin/su",
    "/odm/bin/su",
    "/vendor/bin/su",
    "/vendor/xbin/su",
];

/// Root management packages installed as system apps
pub const ROOT_PACKAGE_PATHS: &[&str] = &[
    "/system/app/Superuser.apk",
    "/system/app/SuperSU.apk",
];

/// Magisk artifacts
pub const MAGISK_PATHS: &[&str] = &[
    "/data/adb/magisk",
    "/sbin/.magisk",
    "/sbin/magisk",
    "/system/bin/magisk",
    "/cache/magisk.log",
    "/data/magisk/magisk.db",
];

/// Command used to resolve `su` through the search path
pub const SU_RESOLVE_COMMAND: &[&str] = &["which", "su"];

/// Default listener range of the injected instrumentation agent
pub const AGENT_PORT_START: u16 = 27042;
pub const AGENT_PORT_END: u16 = 27047;

/// Substrings of injected agent/gadget/loader mappings
pub const AGENT_MAP_MARKERS: &[&str] = &["frida", "gadget", "linjector"];

/// Thread names used by the agent's script loop and event loop
pub const AGENT_THREAD_MARKERS: &[&str] = &["gum-js-loop", "gmain", "frida"];

/// Server binaries dropped on disk
pub const AGENT_SERVER_PATHS: &[&str] = &[
    "/data/local/tmp/frida-server",
    "/data/local/tmp/re.frida.server",
    "/system/bin/frida-server",
    "/system/xbin/frida-server",
];

/// Device nodes, libraries and pseudo-files unique to emulator stacks
pub const EMULATOR_FILES: &[&str] = &[
    "/dev/socket/qemud",
    "/dev/qemu_pipe",
    "/system/lib/libc_malloc_debug_qemu.so",
    "/sys/qemu_trace",
    "/system/bin/qemud",
    "/system/lib/libqemu.so",
    "/system/lib64/libqemu.so",
    "/system/bin/qemu-props",
    "/sys/bus/platform/drivers/qemu_pipe",
    "/dev/socket/baseband_genyd",
];

/// Hardware-description interfaces
pub const HARDWARE_DESCRIPTORS: &[&str] = &["/proc/cpuinfo"];

/// Virtual board identifiers
pub const VIRTUAL_BOARD_MARKERS: &[&str] = &["goldfish", "ranchu"];

/// Build property files
pub const PROPERTY_FILES: &[&str] = &["/system/build.prop", "/default.prop"];

/// Property lines that only appear on emulator images
pub const EMULATOR_PROPERTY_MARKERS: &[&str] = &[
    "ro.kernel.qemu=1",
    "ro.hardware=goldfish",
    "ro.hardware=ranchu",
];

/// Data directories of memory editors and license patchers
pub const TAMPER_TOOL_PATHS: &[&str] = &[
    "/data/data/com.cih.game_cih",
    "/data/data/com.chelpus.lackypatch",
    "/data/data/com.forpda.lp",
    "/data/data/com.android.vending.billing.InAppBillingService.COIN",
    "/data/data/com.android.vendinc",
];

/// Line prefix of the tracer field in the process status interface
pub const TRACER_PID_FIELD: &str = "TracerPid:";
