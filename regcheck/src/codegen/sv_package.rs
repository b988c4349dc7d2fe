use indoc::formatdoc;

use super::{layout, FieldLayout, GenConfig};
use crate::model::RegisterMap;

const RULE: &str = "  // -----------------------------";

fn hex32(value: u64) -> String {
    format!("32'h{value:08X}")
}

/// Render `map` as a SystemVerilog package of `localparam`s
pub(crate) fn emit_sv_package(map: &RegisterMap, cfg: &GenConfig) -> String {
    let prefix = &cfg.prefix;
    let registers = layout(map);

    let mut lines = vec![formatdoc! {"
        // {package}.sv
        //
        // AUTO-GENERATED FILE. DO NOT EDIT BY HAND.
        // Generated from: {source}
        // Generated at:   (omitted for deterministic builds)
        //
        // Notes:
        //   - Addresses are byte addresses.
        //   - Registers are 32-bit.

        package {package};
        ",
        package = cfg.package_name,
        source = cfg.source_label,
    }];

    lines.extend([RULE, "  // Registers (byte addresses)", RULE].map(str::to_owned));
    for (name, addr, _) in &registers {
        lines.push(format!(
            "  localparam logic [31:0] {prefix}_ADR_{name} = {};",
            hex32(*addr)
        ));
    }

    lines.extend(["", RULE, "  // Bitfields", RULE].map(str::to_owned));
    for (reg, _, fields) in registers.iter().filter(|(_, _, f)| !f.is_empty()) {
        lines.push(String::new());
        lines.push(format!("  // {reg} fields"));
        for (field, layout) in fields {
            let sym = format!("{prefix}_{reg}_{field}");
            match layout {
                FieldLayout::Bit(bit) => {
                    lines.push(format!("  localparam int unsigned {sym}_BIT = {bit};"));
                    lines.push(format!(
                        "  localparam logic [31:0] {sym}_MASK = (32'h1 << {sym}_BIT);"
                    ));
                }
                FieldLayout::Range { lsb, mask } => {
                    lines.push(format!("  localparam int unsigned {sym}_LSB  = {lsb};"));
                    lines.push(format!(
                        "  localparam logic [31:0] {sym}_MASK = {};",
                        hex32((*mask).into())
                    ));
                }
            }
        }
    }

    lines.extend(["", "endpackage", ""].map(str::to_owned));
    lines.join("\n")
}

#[test]
fn sv_package_wraps_localparams() {
    let cfg = GenConfig::new("hw/regmap.json").package_name("soc_regmap_pkg");
    let text = emit_sv_package(&super::sample_map(), &cfg);

    assert!(text.starts_with("// soc_regmap_pkg.sv\n"));
    assert!(text.contains("\npackage soc_regmap_pkg;\n"));
    assert!(text.ends_with("\nendpackage\n"));

    let id = text
        .find("  localparam logic [31:0] HOMEINV_ADR_ID = 32'h00000000;")
        .unwrap();
    let ctrl = text
        .find("  localparam logic [31:0] HOMEINV_ADR_CTRL = 32'h00000100;")
        .unwrap();
    assert!(id < ctrl);

    assert!(text.contains(
        "  // CTRL fields\n\
         \x20 localparam int unsigned HOMEINV_CTRL_ENABLE_BIT = 0;\n\
         \x20 localparam logic [31:0] HOMEINV_CTRL_ENABLE_MASK = (32'h1 << HOMEINV_CTRL_ENABLE_BIT);\n\
         \x20 localparam int unsigned HOMEINV_CTRL_MODE_LSB  = 4;\n\
         \x20 localparam logic [31:0] HOMEINV_CTRL_MODE_MASK = 32'h000000F0;\n"
    ));
}
