use indoc::formatdoc;

use super::{layout, FieldLayout, GenConfig};
use crate::model::RegisterMap;

const RULE: &str = "// -----------------------------";

fn hex32(value: u64) -> String {
    format!("0x{value:08X}u")
}

/// Render `map` as a C header of `#define`s
pub(crate) fn emit_c_header(map: &RegisterMap, cfg: &GenConfig) -> String {
    let prefix = &cfg.prefix;
    let registers = layout(map);

    let mut lines = vec![formatdoc! {"
        // {name}
        //
        // AUTO-GENERATED FILE. DO NOT EDIT BY HAND.
        // Generated from: {source}
        // Generated at:   (omitted for deterministic builds)
        //
        // Notes:
        //   - Offsets are byte offsets.
        //   - Registers are 32-bit.
        //
        #pragma once

        #include <stdint.h>
        ",
        name = cfg.header_name,
        source = cfg.source_label,
    }];

    lines.extend([RULE, "// Registers (byte offsets)", RULE].map(str::to_owned));
    for (name, addr, _) in &registers {
        lines.push(format!("#define {prefix}_REG_{name:<16} {}", hex32(*addr)));
    }

    lines.extend(["", RULE, "// Bitfields", RULE].map(str::to_owned));
    for (reg, _, fields) in registers.iter().filter(|(_, _, f)| !f.is_empty()) {
        lines.push(String::new());
        lines.push(format!("// {reg} fields"));
        for (field, layout) in fields {
            let sym = format!("{prefix}_{reg}_{field}");
            match layout {
                FieldLayout::Bit(bit) => {
                    lines.push(format!("#define {sym}_BIT   {bit}u"));
                    lines.push(format!("#define {sym}_MASK  (1u << {sym}_BIT)"));
                }
                FieldLayout::Range { lsb, mask } => {
                    lines.push(format!("#define {sym}_LSB   {lsb}u"));
                    lines.push(format!("#define {sym}_MASK  {}", hex32((*mask).into())));
                }
            }
        }
    }

    lines.push(String::new());
    lines.join("\n")
}

#[test]
fn c_header_lists_registers_by_address() {
    let cfg = GenConfig::new("hw/regmap.json");
    let text = emit_c_header(&super::sample_map(), &cfg);

    assert!(text.starts_with("// home_inventory_regmap.h\n"));
    assert!(text.contains("// Generated from: hw/regmap.json\n"));
    assert!(text.contains("#pragma once\n\n#include <stdint.h>\n"));

    let id = text.find("#define HOMEINV_REG_ID               0x00000000u").unwrap();
    let ctrl = text.find("#define HOMEINV_REG_CTRL             0x00000100u").unwrap();
    assert!(id < ctrl);

    assert!(text.contains(
        "// CTRL fields\n\
         #define HOMEINV_CTRL_ENABLE_BIT   0u\n\
         #define HOMEINV_CTRL_ENABLE_MASK  (1u << HOMEINV_CTRL_ENABLE_BIT)\n\
         #define HOMEINV_CTRL_MODE_LSB   4u\n\
         #define HOMEINV_CTRL_MODE_MASK  0x000000F0u\n"
    ));
    assert!(!text.contains("// ID fields"));
    assert!(text.ends_with('\n'));
}

#[test]
fn c_header_uses_configured_prefix() {
    let cfg = GenConfig::new("x").prefix("SOC").header_name("soc_regs.h");
    let text = emit_c_header(&super::sample_map(), &cfg);
    assert!(text.starts_with("// soc_regs.h\n"));
    assert!(text.contains("#define SOC_REG_ID "));
    assert!(!text.contains("HOMEINV"));
}
