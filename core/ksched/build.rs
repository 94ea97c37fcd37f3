// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

use std::env;
use std::fs;
use std::path::Path;

const DEFAULT_CPU_NUM: usize = 2;

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();
    let config_rs_path = Path::new(&out_dir).join("config.rs");

    // The kbuild flow exports the board's core count; fall back to the
    // dual-core default otherwise.
    let cpu_num = match env::var("KSCHED_CPU_NUM") {
        Ok(v) => v
            .trim()
            .parse::<usize>()
            .expect("KSCHED_CPU_NUM must be a positive integer"),
        Err(_) => DEFAULT_CPU_NUM,
    };
    assert!(cpu_num > 0, "KSCHED_CPU_NUM must be a positive integer");

    let config_content = format!(
        "/// Number of CPU cores managed by the scheduler.\npub const CPU_NUM: usize = {cpu_num};\n"
    );
    fs::write(&config_rs_path, config_content).expect("Failed to write config.rs to OUT_DIR");

    println!("cargo:rerun-if-env-changed=KSCHED_CPU_NUM");
    println!("cargo:rerun-if-changed=build.rs");
}
