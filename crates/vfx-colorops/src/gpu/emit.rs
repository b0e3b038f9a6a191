//! Per-op shader emitters.
//!
//! Each emitter appends one `{ ... }` block transforming the pixel variable.
//! The formulas track the CPU kernels term by term so both targets agree
//! within float rounding.

use super::shader_creator::{GpuShaderCreator, GpuTexture, TextureDimensions, float_lit};
use crate::cpu::{
    CDL_RECIPROCAL_FLOOR, D65_U, D65_V, LUV_EPSILON, LUV_KAPPA, MAX_HSV_SAT, surround_luma,
};
use crate::error::{OpError, OpResult};
use crate::op::Op;
use crate::opdata::{
    CdlOpData, ExposureContrastOpData, ExposureContrastStyle, FixedFunctionOpData,
    FixedFunctionStyle, GammaOpData, GammaParams, LogOpData, Lut1DOpData, Lut3DOpData,
    MIN_CONTRAST, MIN_PIVOT, MatrixOpData, MoncurveCoefs, NegativeStyle, OpData, RangeOpData,
    VIDEO_OETF_POWER,
};
use crate::dynamic::DynamicProperty;
use vfx_core::REC709_LUMA;
use vfx_core::pixel::{HALF_MAX, HALF_MIN_NORMAL};
use vfx_lut::Interpolation;

/// Widest 1D LUT texture row.
pub const MAX_LUT1D_WIDTH: usize = 4096;

/// Appends the shader code of `op` to `sc`.
pub fn emit_op(sc: &mut GpuShaderCreator, op: &Op) -> OpResult<()> {
    match op.data() {
        OpData::Matrix(d) => emit_matrix(sc, d),
        OpData::Range(d) => {
            emit_range(sc, d);
            Ok(())
        }
        OpData::Lut1D(d) => emit_lut1d(sc, d),
        OpData::Lut3D(d) => emit_lut3d(sc, d),
        OpData::Gamma(d) => {
            emit_gamma(sc, d);
            Ok(())
        }
        OpData::Exponent(d) => {
            let e = d.effective_exponent().map(|v| v as f32);
            emit_power(sc, e, d.negative_style);
            Ok(())
        }
        OpData::Log(d) => {
            emit_log(sc, d);
            Ok(())
        }
        OpData::Cdl(d) => {
            emit_cdl(sc, d);
            Ok(())
        }
        OpData::ExposureContrast(d) => {
            emit_exposure_contrast(sc, d);
            Ok(())
        }
        OpData::FixedFunction(d) => emit_fixed_function(sc, d),
        OpData::NoOp(_) => Err(OpError::internal(format!("marker {op} reached the shader"))),
    }
}

/// Pixel swizzle and vector width for ops that touch alpha only when asked.
fn target(sc: &GpuShaderCreator, with_alpha: bool) -> (String, usize) {
    let p = sc.pixel_name();
    if with_alpha { (p.to_string(), 4) } else { (format!("{p}.rgb"), 3) }
}

fn lit3(sc: &GpuShaderCreator, v: [f64; 3]) -> String {
    sc.vec_lit(&v.map(|x| x as f32))
}

fn fill(sc: &GpuShaderCreator, n: usize, v: f32) -> String {
    sc.vec_lit(&vec![v; n])
}

// ============================================================================
// Matrix and range
// ============================================================================

fn emit_matrix(sc: &mut GpuShaderCreator, d: &MatrixOpData) -> OpResult<()> {
    let m = d.resolved()?;
    let offset = m.offset.map(|v| v as f32);
    let touches_alpha = offset[3] != 0.0
        || (0..4).any(|i| {
            let row = m.matrix.m[i];
            if i == 3 { row != [0.0, 0.0, 0.0, 1.0] } else { row[3] != 0.0 }
        });
    let (px, n) = target(sc, touches_alpha);

    let product = if m.matrix.is_diagonal(0.0) {
        let diag = m.matrix.diag().map(|v| v as f32);
        format!("{px} * {}", sc.vec_lit(&diag[..n]))
    } else if n == 4 {
        sc.mat_mul(&m.matrix.to_f32_rows(), &px)
    } else {
        let full = sc.mat_mul(&m.matrix.to_f32_rows(), sc.pixel_name());
        format!("({full}).rgb")
    };
    let line = if m.has_offset() {
        format!("{px} = {product} + {};", sc.vec_lit(&offset[..n]))
    } else {
        format!("{px} = {product};")
    };
    sc.add_line(&line);
    Ok(())
}

fn emit_range(sc: &mut GpuShaderCreator, d: &RangeOpData) {
    let (scale, offset) = (d.scale() as f32, d.offset() as f32);
    let (px, n) = target(sc, false);
    if scale != 1.0 || offset != 0.0 {
        sc.add_line(&format!(
            "{px} = {px} * {} + {};",
            fill(sc, n, scale),
            fill(sc, n, offset)
        ));
    }
    if let Some(lo) = d.lower_bound() {
        sc.add_line(&format!("{px} = max({}, {px});", fill(sc, n, lo as f32)));
    }
    if let Some(hi) = d.upper_bound() {
        sc.add_line(&format!("{px} = min({}, {px});", fill(sc, n, hi as f32)));
    }
}

// ============================================================================
// Gamma and exponent
// ============================================================================

fn emit_power(sc: &mut GpuShaderCreator, exponent: [f32; 4], negatives: NegativeStyle) {
    let (px, n) = target(sc, exponent[3] != 1.0);
    let e = sc.vec_lit(&exponent[..n]);
    let zero = fill(sc, n, 0.0);
    let line = match negatives {
        NegativeStyle::Clamp => format!("{px} = pow(max({zero}, {px}), {e});"),
        NegativeStyle::Mirror => format!("{px} = sign({px}) * pow(abs({px}), {e});"),
        NegativeStyle::PassThru => format!(
            "{px} = {}(pow(max({zero}, {px}), {e}), {px}, step({px}, {zero}));",
            sc.mix()
        ),
    };
    sc.add_line(&line);
}

fn emit_gamma(sc: &mut GpuShaderCreator, d: &GammaOpData) {
    let style = d.style;
    if !style.is_moncurve() {
        let e = d.params.map(|p| {
            let g = p.gamma as f32;
            if style.is_forward() { g } else { 1.0 / g }
        });
        let negatives = if style.is_mirror() {
            NegativeStyle::Mirror
        } else if style.is_pass_thru() {
            NegativeStyle::PassThru
        } else {
            NegativeStyle::Clamp
        };
        // alpha stays untouched when its parameters are the identity
        let e = if d.params[3] == GammaParams::IDENTITY { [e[0], e[1], e[2], 1.0] } else { e };
        emit_power(sc, e, negatives);
        return;
    }

    let coefs = d.params.map(MoncurveCoefs::new);
    let (px, n) = target(sc, d.params[3] != GammaParams::IDENTITY);
    let vec = |f: &dyn Fn(&MoncurveCoefs) -> f64| -> String {
        let v: Vec<f32> = coefs[..n].iter().map(|c| f(c) as f32).collect();
        sc.vec_lit(&v)
    };
    let ty = if n == 4 { sc.vec4() } else { sc.vec3() };
    let zero = fill(sc, n, 0.0);
    let one = fill(sc, n, 1.0);
    let offset = vec(&|c| c.offset);

    let mut lines = Vec::new();
    let input = if style.is_mirror() { format!("abs({px})") } else { px.clone() };
    lines.push(format!("{ty} x = {input};"));
    if style.is_forward() {
        lines.push(format!(
            "{ty} curve = pow(max({zero}, (x + {offset}) / ({one} + {offset})), {});",
            vec(&|c| c.gamma)
        ));
        lines.push(format!("{ty} line = x * {};", vec(&|c| c.slope)));
        lines.push(format!(
            "{ty} res = {}(line, curve, step({}, x));",
            sc.mix(),
            vec(&|c| c.break_point)
        ));
    } else {
        lines.push(format!(
            "{ty} curve = pow(max({zero}, x), {}) * ({one} + {offset}) - {offset};",
            vec(&|c| 1.0 / c.gamma)
        ));
        lines.push(format!(
            "{ty} line = x * {};",
            vec(&|c| if c.slope > 0.0 { 1.0 / c.slope } else { 0.0 })
        ));
        lines.push(format!(
            "{ty} res = {}(line, curve, step({}, x));",
            sc.mix(),
            vec(&|c| c.reverse_break())
        ));
    }
    if style.is_mirror() {
        lines.push(format!("{px} = sign({px}) * res;"));
    } else {
        lines.push(format!("{px} = res;"));
    }
    block(sc, &lines);
}

fn block(sc: &mut GpuShaderCreator, lines: &[String]) {
    sc.add_line("{");
    for l in lines {
        sc.add_line(&format!("  {l}"));
    }
    sc.add_line("}");
}

// ============================================================================
// Log
// ============================================================================

fn emit_log(sc: &mut GpuShaderCreator, d: &LogOpData) {
    let ch = d.channels();
    let v3 = sc.vec3();
    let (px, _) = target(sc, false);
    let pick = |f: &dyn Fn(usize) -> f64| lit3(sc, [f(0), f(1), f(2)]);

    let log_scale = pick(&|i| ch[i].log_scale);
    let log_offset = pick(&|i| ch[i].log_offset);
    let lin_slope = pick(&|i| ch[i].lin_slope);
    let lin_offset = pick(&|i| ch[i].lin_offset);
    let camera = d.is_camera();

    let mut lines = Vec::new();
    if d.direction.is_forward() {
        lines.push(format!(
            "{v3} res = {log_scale} * log(max({}, {px} * {lin_slope} + {lin_offset})) + {log_offset};",
            fill(sc, 3, f32::MIN_POSITIVE)
        ));
        if camera {
            let brk = pick(&|i| ch[i].camera.map_or(f64::from(f32::MIN), |c| c.lin_break));
            let slope = pick(&|i| ch[i].camera.map_or(0.0, |c| c.slope));
            let offset = pick(&|i| ch[i].camera.map_or(0.0, |c| c.offset));
            lines.push(format!(
                "res = {}(res, {px} * {slope} + {offset}, step({px}, {brk}));",
                sc.mix()
            ));
        }
    } else {
        lines.push(format!(
            "{v3} res = (exp(({px} - {log_offset}) / {log_scale}) - {lin_offset}) / {lin_slope};"
        ));
        if camera {
            let brk = pick(&|i| ch[i].camera.map_or(f64::from(f32::MIN), |c| c.log_break));
            let inv_slope = pick(&|i| ch[i].camera.map_or(0.0, |c| 1.0 / c.slope));
            let offset = pick(&|i| ch[i].camera.map_or(0.0, |c| c.offset));
            lines.push(format!(
                "res = {}(res, ({px} - {offset}) * {inv_slope}, step({px}, {brk}));",
                sc.mix()
            ));
        }
    }
    lines.push(format!("{px} = res;"));
    block(sc, &lines);
}

// ============================================================================
// CDL
// ============================================================================

fn emit_cdl(sc: &mut GpuShaderCreator, d: &CdlOpData) {
    let forward = d.style.is_forward();
    let clamping = d.style.is_clamping();
    let recip = |v: f64| 1.0 / (v as f32).max(CDL_RECIPROCAL_FLOOR);
    let (slope, offset, power, saturation) = if forward {
        (
            d.slope.map(|v| v as f32),
            d.offset.map(|v| v as f32),
            d.power.map(|v| v as f32),
            d.saturation as f32,
        )
    } else {
        (
            d.slope.map(recip),
            d.offset.map(|v| -v as f32),
            d.power.map(recip),
            recip(d.saturation),
        )
    };

    let (px, _) = target(sc, false);
    let zero = fill(sc, 3, 0.0);
    let one = fill(sc, 3, 1.0);
    let clamp_line = format!("{px} = clamp({px}, {zero}, {one});");
    let power_line = if clamping {
        format!("{px} = pow(clamp({px}, {zero}, {one}), {});", sc.vec_lit(&power))
    } else {
        format!(
            "{px} = {}(pow(max({zero}, {px}), {p}), {px}, step({px}, {zero}));",
            sc.mix(),
            p = sc.vec_lit(&power)
        )
    };
    let sat_lines = [
        format!("float luma = dot({px}, {});", sc.vec_lit(&REC709_LUMA)),
        format!(
            "{px} = {l} + {} * ({px} - {l});",
            fill(sc, 3, saturation),
            l = sc.splat3("luma")
        ),
    ];

    let mut lines = Vec::new();
    if forward {
        lines.push(format!(
            "{px} = {px} * {} + {};",
            sc.vec_lit(&slope),
            sc.vec_lit(&offset)
        ));
        lines.push(power_line);
        lines.extend(sat_lines);
        if clamping {
            lines.push(clamp_line);
        }
    } else {
        if clamping {
            lines.push(clamp_line.clone());
        }
        lines.extend(sat_lines);
        lines.push(power_line);
        lines.push(format!(
            "{px} = ({px} + {}) * {};",
            sc.vec_lit(&offset),
            sc.vec_lit(&slope)
        ));
        if clamping {
            lines.push(clamp_line);
        }
    }
    block(sc, &lines);
}

// ============================================================================
// Exposure and contrast
// ============================================================================

fn scalar(sc: &mut GpuShaderCreator, prop: &DynamicProperty) -> String {
    if prop.is_dynamic() {
        sc.uniform_for(prop)
    } else {
        float_lit(prop.double() as f32)
    }
}

fn emit_exposure_contrast(sc: &mut GpuShaderCreator, d: &ExposureContrastOpData) {
    let exposure = scalar(sc, &d.exposure);
    let contrast = scalar(sc, &d.contrast);
    let gamma = scalar(sc, &d.gamma);

    let pivot = d.pivot.max(MIN_PIVOT);
    let pivot = match d.style {
        ExposureContrastStyle::Linear => pivot,
        ExposureContrastStyle::Video => pivot.powf(VIDEO_OETF_POWER),
        ExposureContrastStyle::Logarithmic => {
            ((pivot / 0.18).log2() * d.log_exposure_step + d.log_mid_gray).max(0.0)
        }
    };
    let pivot = float_lit(pivot as f32);
    let min_c = float_lit(MIN_CONTRAST as f32);
    let (px, _) = target(sc, false);
    let zero = fill(sc, 3, 0.0);
    let splat = |e: &str| sc.splat3(e);

    let mut lines = vec![format!("float exposure = {exposure};")];
    match d.style {
        ExposureContrastStyle::Logarithmic => {
            let step = float_lit(d.log_exposure_step as f32);
            if d.direction.is_forward() {
                lines.push(format!("float contrast = max({min_c}, {contrast} * {gamma});"));
                lines.push(format!(
                    "float offset = (exposure * {step} - {pivot}) * contrast + {pivot};"
                ));
                lines.push(format!(
                    "{px} = {px} * {} + {};",
                    splat("contrast"),
                    splat("offset")
                ));
            } else {
                lines.push(format!(
                    "float contrast = max({min_c}, 1.0 / ({contrast} * {gamma}));"
                ));
                lines.push(format!(
                    "float offset = {pivot} - {pivot} * contrast - exposure * {step};"
                ));
                lines.push(format!(
                    "{px} = {px} * {} + {};",
                    splat("contrast"),
                    splat("offset")
                ));
            }
        }
        style => {
            lines.push(format!("float contrast = max({min_c}, {contrast} * {gamma});"));
            if style == ExposureContrastStyle::Video {
                lines.push(format!(
                    "float gain = pow(exp2(exposure), {});",
                    float_lit(VIDEO_OETF_POWER as f32)
                ));
            } else {
                lines.push("float gain = exp2(exposure);".to_string());
            }
            lines.push("if (contrast == 1.0) {".to_string());
            if d.direction.is_forward() {
                lines.push(format!("  {px} = {px} * {};", splat("gain")));
                lines.push("} else {".to_string());
                lines.push(format!(
                    "  {px} = pow(max({zero}, {px} * {}), {}) * {};",
                    splat(&format!("gain / {pivot}")),
                    splat("contrast"),
                    splat(&pivot)
                ));
            } else {
                lines.push(format!("  {px} = {px} * {};", splat("1.0 / gain")));
                lines.push("} else {".to_string());
                lines.push(format!(
                    "  {px} = pow(max({zero}, {px} / {}), {}) * {};",
                    splat(&pivot),
                    splat("1.0 / contrast"),
                    splat(&format!("{pivot} / gain"))
                ));
            }
            lines.push("}".to_string());
        }
    }
    block(sc, &lines);
}

// ============================================================================
// Fixed functions
// ============================================================================

fn emit_fixed_function(sc: &mut GpuShaderCreator, d: &FixedFunctionOpData) -> OpResult<()> {
    use FixedFunctionStyle as S;
    let p = sc.pixel_name().to_string();
    let v3 = sc.vec3();
    let lit = float_lit;

    if let Some(power) = d.surround_power() {
        let (w, min_lum) = surround_luma(d.style);
        let lines = [
            format!(
                "float y = max({}, dot({p}.rgb, {}));",
                lit(min_lum),
                sc.vec_lit(&w)
            ),
            format!("{p}.rgb = {p}.rgb * {};", sc.splat3(&format!("pow(y, {})", lit(power as f32)))),
        ];
        block(sc, &lines);
        return Ok(());
    }

    let lines: Vec<String> = match d.style {
        S::RgbToHsv => vec![
            format!("float r = {p}.r;"),
            format!("float g = {p}.g;"),
            format!("float b = {p}.b;"),
            "float mn = min(min(r, g), b);".into(),
            "float mx = max(max(r, g), b);".into(),
            "float val = mx;".into(),
            "float sat = 0.0;".into(),
            "float hue = 0.0;".into(),
            "if (mn != mx) {".into(),
            "  float delta = mx - mn;".into(),
            "  if (mx != 0.0) { sat = delta / mx; }".into(),
            "  if (r == mx) { hue = (g - b) / delta; }".into(),
            "  else if (g == mx) { hue = 2.0 + (b - r) / delta; }".into(),
            "  else { hue = 4.0 + (r - g) / delta; }".into(),
            "  if (hue < 0.0) { hue = hue + 6.0; }".into(),
            "  hue = hue / 6.0;".into(),
            "}".into(),
            "if (mn < 0.0) { val = val + mn; }".into(),
            "if (-mn > mx) { sat = (mx - mn) / -mn; }".into(),
            format!("{p}.rgb = {v3}(hue, sat, val);"),
        ],
        S::HsvToRgb => vec![
            format!("float hue = ({p}.r - floor({p}.r)) * 6.0;"),
            format!("float sat = clamp({p}.g, 0.0, {});", lit(MAX_HSV_SAT)),
            format!("float val = {p}.b;"),
            "float r = clamp(abs(hue - 3.0) - 1.0, 0.0, 1.0);".into(),
            "float g = clamp(2.0 - abs(hue - 2.0), 0.0, 1.0);".into(),
            "float b = clamp(2.0 - abs(hue - 4.0), 0.0, 1.0);".into(),
            "float mx = val;".into(),
            "float mn = val * (1.0 - sat);".into(),
            "if (sat > 1.0) { mn = val * (1.0 - sat) / (2.0 - sat); mx = val - mn; }".into(),
            "if (val < 0.0) { mn = val / (2.0 - sat); mx = val - mn; }".into(),
            "float delta = mx - mn;".into(),
            format!("{p}.rgb = {v3}(r * delta + mn, g * delta + mn, b * delta + mn);"),
        ],
        S::XyzToXyy => vec![
            format!("{v3} c = {p}.rgb;"),
            "float s = c.x + c.y + c.z;".into(),
            "float d = 0.0;".into(),
            "if (s != 0.0) { d = 1.0 / s; }".into(),
            format!("{p}.rgb = {v3}(c.x * d, c.y * d, c.y);"),
        ],
        S::XyyToXyz => vec![
            format!("{v3} c = {p}.rgb;"),
            "float d = 0.0;".into(),
            "if (c.y != 0.0) { d = 1.0 / c.y; }".into(),
            format!("{p}.rgb = {v3}(c.z * c.x * d, c.z, c.z * (1.0 - c.x - c.y) * d);"),
        ],
        S::XyzToUvy => vec![
            format!("{v3} c = {p}.rgb;"),
            "float s = c.x + 15.0 * c.y + 3.0 * c.z;".into(),
            "float d = 0.0;".into(),
            "if (s != 0.0) { d = 1.0 / s; }".into(),
            format!("{p}.rgb = {v3}(4.0 * c.x * d, 9.0 * c.y * d, c.y);"),
        ],
        S::UvyToXyz => vec![
            format!("{v3} c = {p}.rgb;"),
            "float d = 0.0;".into(),
            "if (c.y != 0.0) { d = 1.0 / c.y; }".into(),
            format!(
                "{p}.rgb = {v3}(2.25 * c.z * c.x * d, c.z, 0.75 * c.z * (4.0 - c.x - {} * c.y) * d);",
                lit(6.666_666_7)
            ),
        ],
        S::XyzToLuv => vec![
            format!("{v3} c = {p}.rgb;"),
            "float s = c.x + 15.0 * c.y + 3.0 * c.z;".into(),
            "float d = 0.0;".into(),
            "if (s != 0.0) { d = 1.0 / s; }".into(),
            "float u = 4.0 * c.x * d;".into(),
            "float v = 9.0 * c.y * d;".into(),
            "float l = 0.0;".into(),
            format!(
                "if (c.y <= {}) {{ l = {} * c.y; }} else {{ l = 1.16 * pow(c.y, {}) - 0.16; }}",
                lit(LUV_EPSILON),
                lit(LUV_KAPPA),
                lit(1.0 / 3.0)
            ),
            format!(
                "{p}.rgb = {v3}(l, 13.0 * l * (u - {}), 13.0 * l * (v - {}));",
                lit(D65_U),
                lit(D65_V)
            ),
        ],
        S::LuvToXyz => vec![
            format!("{v3} c = {p}.rgb;"),
            "float l = c.x;".into(),
            "float d = 0.0;".into(),
            "if (l != 0.0) { d = 1.0 / (13.0 * l); }".into(),
            format!("float u = c.y * d + {};", lit(D65_U)),
            format!("float v = c.z * d + {};", lit(D65_V)),
            "float t = (l + 0.16) / 1.16;".into(),
            "float y = t * t * t;".into(),
            format!("if (l <= 0.08) {{ y = l / {}; }}", lit(LUV_KAPPA)),
            "float dd = 0.0;".into(),
            "if (v != 0.0) { dd = 0.25 / v; }".into(),
            format!("{p}.rgb = {v3}(9.0 * y * u * dd, y, y * (12.0 - 3.0 * u - 20.0 * v) * dd);"),
        ],
        other => {
            return Err(OpError::invalid(format!(
                "fixed function {} is missing its parameter",
                other.name()
            )));
        }
    };
    block(sc, &lines);
    Ok(())
}

// ============================================================================
// Lookup tables
// ============================================================================

/// Rows of a 1D LUT texture with a one-texel overlap between rows.
fn lut1d_layout(entries: usize) -> (usize, usize) {
    if entries <= MAX_LUT1D_WIDTH {
        return (entries, 1);
    }
    let width = MAX_LUT1D_WIDTH;
    (width, (entries - 1).div_ceil(width - 1))
}

fn lut1d_texture(name: String, d: &Lut1DOpData) -> GpuTexture {
    let lut = &d.lut;
    let n = lut.size();
    let (width, height) = lut1d_layout(n);
    let mut data = Vec::with_capacity(width * height * 3);
    for row in 0..height {
        for col in 0..width {
            let i = (row * (width - 1) + col).min(n - 1);
            data.extend([lut.r[i], lut.g[i], lut.b[i]]);
        }
    }
    let interpolation = match lut.interpolation {
        Interpolation::Nearest => Interpolation::Nearest,
        _ => Interpolation::Linear,
    };
    GpuTexture {
        name,
        dimensions: TextureDimensions::Tex2D,
        width,
        height,
        depth: 1,
        channels: 3,
        interpolation,
        data,
    }
}

fn emit_lut1d(sc: &mut GpuShaderCreator, d: &Lut1DOpData) -> OpResult<()> {
    if !d.direction.is_forward() {
        return Err(OpError::unsupported(
            "inverse 1D LUTs must be baked before shader generation",
        ));
    }
    let name = sc.resource_name("lut1d");
    let tex = lut1d_texture(name.clone(), d);
    let (width, height) = (tex.width, tex.height);
    let n = d.lut.size();
    sc.add_texture(tex);

    let v2 = sc.vec2();
    let lit = |v: f32| float_lit(v);
    let mut helper = format!("{v2} {name}_coords(float x)\n{{\n");
    if d.lut.half_domain {
        helper.push_str(&format!("  float a = min(abs(x), {});\n", lit(HALF_MAX)));
        helper.push_str("  float f = a * 16777216.0;\n");
        helper.push_str(&format!("  if (a >= {}) {{\n", lit(HALF_MIN_NORMAL)));
        helper.push_str("    float e = floor(log2(a));\n");
        helper.push_str("    f = (e + 15.0) * 1024.0 + (a / exp2(e) - 1.0) * 1024.0;\n");
        helper.push_str("  }\n");
        helper.push_str("  if (x <= 0.0) { f = f + 32768.0; }\n");
    } else {
        helper.push_str(&format!(
            "  float f = clamp(x, 0.0, 1.0) * {};\n",
            lit((n - 1) as f32)
        ));
    }
    helper.push_str(&format!(
        "  float row = min(floor(f / {}), {});\n",
        lit((width - 1).max(1) as f32),
        lit((height - 1) as f32)
    ));
    helper.push_str(&format!("  float col = f - row * {};\n", lit((width - 1) as f32)));
    helper.push_str(&format!(
        "  return {v2}((col + 0.5) / {}, (row + 0.5) / {});\n}}\n",
        lit(width as f32),
        lit(height as f32)
    ));
    sc.add_helper(&helper);

    let p = sc.pixel_name().to_string();
    for c in ["r", "g", "b"] {
        let lookup = sc.sample_2d(&name, &format!("{name}_coords({p}.{c})"));
        sc.add_line(&format!("{p}.{c} = {lookup}.{c};"));
    }
    Ok(())
}

fn emit_lut3d(sc: &mut GpuShaderCreator, d: &Lut3DOpData) -> OpResult<()> {
    if !d.direction.is_forward() {
        return Err(OpError::unsupported(
            "inverse 3D LUTs must be baked before shader generation",
        ));
    }
    let lut = &d.lut;
    let edge = lut.size;
    let name = sc.resource_name("lut3d");
    let interpolation = match lut.interpolation {
        Interpolation::Linear => Interpolation::Linear,
        _ => Interpolation::Nearest,
    };
    sc.add_texture(GpuTexture {
        name: name.clone(),
        dimensions: TextureDimensions::Tex3D,
        width: edge,
        height: edge,
        depth: edge,
        channels: 3,
        interpolation,
        data: lut.data.iter().flatten().copied().collect(),
    });

    let p = sc.pixel_name().to_string();
    let v3 = sc.vec3();
    let zero = fill(sc, 3, 0.0);
    let one = fill(sc, 3, 1.0);
    let e = float_lit(edge as f32);
    let last = fill(sc, 3, (edge - 1) as f32);

    if lut.interpolation != Interpolation::Tetrahedral {
        let coords = format!(
            "(clamp({p}.rgb, {zero}, {one}) * {last} + {}) / {}",
            fill(sc, 3, 0.5),
            fill(sc, 3, edge as f32)
        );
        let lookup = sc.sample_3d(&name, &coords);
        sc.add_line(&format!("{p}.rgb = {lookup}.rgb;"));
        return Ok(());
    }

    let step = float_lit(1.0 / edge as f32);
    let fetch = |dr: u8, dg: u8, db: u8| -> String {
        let off = |on: u8| if on == 1 { step.clone() } else { "0.0".to_string() };
        let coords = format!("c0 + {v3}({}, {}, {})", off(dr), off(dg), off(db));
        format!(
            "{v3} v{dr}{dg}{db} = {}.rgb;",
            sc.sample_3d(&name, &coords)
        )
    };
    let mut lines = vec![
        format!("{v3} pos = clamp({p}.rgb, {zero}, {one}) * {last};"),
        format!("{v3} base = min(floor(pos), {});", fill(sc, 3, edge.saturating_sub(2) as f32)),
        format!("{v3} f = pos - base;"),
        format!("{v3} c0 = (base + {}) / {};", fill(sc, 3, 0.5), sc.splat3(&e)),
    ];
    for (r, g, b) in [
        (0, 0, 0),
        (1, 0, 0),
        (0, 1, 0),
        (1, 1, 0),
        (0, 0, 1),
        (1, 0, 1),
        (0, 1, 1),
        (1, 1, 1),
    ] {
        lines.push(fetch(r, g, b));
    }
    // one tetrahedron per ordering of the fractional offsets
    let tet = |(a, va): (&str, &str), (b, vb): (&str, &str), c: &str| -> String {
        format!("res = v000 + f.{a} * ({va} - v000) + f.{b} * ({vb} - {va}) + f.{c} * (v111 - {vb});")
    };
    lines.extend([
        format!("{v3} res = v000;"),
        "if (f.r > f.g) {".into(),
        format!("  if (f.g > f.b) {{ {} }}", tet(("r", "v100"), ("g", "v110"), "b")),
        format!("  else if (f.r > f.b) {{ {} }}", tet(("r", "v100"), ("b", "v101"), "g")),
        format!("  else {{ {} }}", tet(("b", "v001"), ("r", "v101"), "g")),
        "} else if (f.g > f.b) {".into(),
        format!("  if (f.r > f.b) {{ {} }}", tet(("g", "v010"), ("r", "v110"), "b")),
        format!("  else {{ {} }}", tet(("g", "v010"), ("b", "v011"), "r")),
        "} else {".into(),
        format!("  {}", tet(("b", "v001"), ("g", "v011"), "r")),
        "}".into(),
        format!("{p}.rgb = res;"),
    ]);
    block(sc, &lines);
    Ok(())
}
