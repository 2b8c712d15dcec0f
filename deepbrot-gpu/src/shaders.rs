//! WGSL compute kernels. Each mirrors a CPU reference implementation: the
//! shallow and perturbation kernels follow the engine's direct/perturbation
//! boards, the adaptive kernel follows `adaptive_kernel.rs`.

/// Shared preamble: uniforms and the iteration calendar.
const PREAMBLE: &str = r#"
struct Params {
    n: u32,
    exponent: u32,
    chunk_start: u32,
    chunk_len: u32,
    orbit_len: u32,
    ref_escaped: u32,
    initial_scale: i32,
    _pad0: u32,
    eps1: f32,
    eps2: f32,
    _pad1: u32,
    _pad2: u32,
}

@group(0) @binding(0) var<uniform> params: Params;

fn cmul(a: vec2<f32>, b: vec2<f32>) -> vec2<f32> {
    return vec2<f32>(a.x * b.x - a.y * b.y, a.x * b.y + a.y * b.x);
}

fn cheb(a: vec2<f32>) -> f32 {
    return max(abs(a.x), abs(a.y));
}

fn checkpoint_stride(i: u32) -> u32 {
    var best = 1u;
    var t = 1u;
    loop {
        if (t > i) { break; }
        let q = i / t;
        // q >= 1626 guarantees q^3 overflows past any u32 stride.
        if (q >= 1626u || q * q * q > t) { best = t; } else { break; }
        t = t << 1u;
    }
    return best;
}

fn snapshot_due(i: u32) -> bool {
    return (i % checkpoint_stride(i)) == 0u;
}
"#;

const SHALLOW_BODY: &str = r#"
struct Pixel {
    z: vec2<f32>,
    b: vec2<f32>,
    c: vec2<f32>,
    nn: i32,
    period: u32,
    cp_iter: u32,
    cap: u32,
}

@group(0) @binding(1) var<storage, read_write> pixels: array<Pixel>;

fn zpow(z: vec2<f32>, n: u32) -> vec2<f32> {
    var acc = z;
    for (var j = 1u; j < n; j = j + 1u) {
        acc = cmul(acc, z);
    }
    return acc;
}

@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let i = gid.x;
    if (i >= params.n) { return; }
    var px = pixels[i];
    if (px.nn != 0) { return; }

    var it = params.chunk_start;
    for (var s = 0u; s < params.chunk_len; s = s + 1u) {
        it = it + 1u;
        let z = zpow(px.z, params.exponent) + px.c;
        px.z = z;
        if (dot(z, z) > 4.0) {
            px.nn = i32(it);
            break;
        }
        let d = abs(z.x - px.b.x) + abs(z.y - px.b.y);
        var finished = false;
        if (d <= params.eps1) {
            finished = true;
        } else {
            if (d <= params.eps2 && px.period == 0u) {
                px.period = it - px.cp_iter;
            }
            if (it >= px.cap) {
                finished = true;
            }
        }
        if (finished) {
            // b doubles as the finished pixel's cycle point.
            px.nn = -i32(it);
            px.b = z;
            break;
        }
        if (snapshot_due(it)) {
            px.b = z;
            px.cp_iter = it;
            px.period = 0u;
        }
    }
    pixels[i] = px;
}
"#;

const PERTURB_BODY: &str = r#"
struct Pixel {
    delta: vec2<f32>,
    b: vec2<f32>,
    dc: vec2<f32>,
    nn: i32,
    period: u32,
    cp_iter: u32,
    has_cp: u32,
    ref_iter: u32,
    cap: u32,
}

@group(0) @binding(1) var<storage, read_write> pixels: array<Pixel>;
@group(0) @binding(2) var<storage, read> orbit: array<vec2<f32>>;

@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let i = gid.x;
    if (i >= params.n) { return; }
    var px = pixels[i];
    if (px.nn != 0) { return; }

    var it = params.chunk_start;
    for (var s = 0u; s < params.chunk_len; s = s + 1u) {
        it = it + 1u;
        var m = px.ref_iter;
        if (m + 1u >= params.orbit_len) {
            if (params.ref_escaped == 1u && m < params.orbit_len) {
                px.delta = orbit[m] + px.delta;
                px.ref_iter = 0u;
                m = 0u;
            } else {
                px.nn = i32(it);
                px.b = px.delta;
                break;
            }
        }
        let zm = orbit[m];

        // delta' = sum_{k=1..n} C(n,k) Z^(n-k) delta^k + dc, Horner form.
        var acc = vec2<f32>(1.0, 0.0);
        var coeff = 1.0;
        var zp = vec2<f32>(1.0, 0.0);
        for (var k = params.exponent - 1u; k >= 1u; k = k - 1u) {
            zp = cmul(zp, zm);
            coeff = coeff * f32(k + 1u) / f32(params.exponent - k);
            acc = cmul(acc, px.delta) + coeff * zp;
        }
        let dn = cmul(px.delta, acc) + px.dc;

        let zn = orbit[m + 1u] + dn;
        if (dot(zn, zn) > 4.0) {
            px.nn = i32(it);
            px.b = zn;
            break;
        }
        if (cheb(zn) < 2.0 * cheb(dn)) {
            px.delta = zn;
            px.ref_iter = 0u;
        } else {
            px.delta = dn;
            px.ref_iter = m + 1u;
        }

        var finished = false;
        if (px.has_cp == 1u) {
            let d = abs(zn.x - px.b.x) + abs(zn.y - px.b.y);
            if (d <= params.eps1) {
                finished = true;
                if (px.period == 0u) { px.period = it - px.cp_iter; }
            } else if (d <= params.eps2 && px.period == 0u) {
                px.period = it - px.cp_iter;
            }
        }
        if (!finished && it >= px.cap) {
            finished = true;
        }
        if (finished) {
            px.nn = -i32(it);
            px.b = zn;
            break;
        }
        if (snapshot_due(it)) {
            px.b = zn;
            px.has_cp = 1u;
            px.cp_iter = it;
            px.period = 0u;
        }
    }
    pixels[i] = px;
}
"#;

const ADAPTIVE_BODY: &str = r#"
struct Pixel {
    delta: vec2<f32>,
    b: vec2<f32>,
    dc: vec2<f32>,
    nn: i32,
    period: u32,
    cp_iter: u32,
    has_cp: u32,
    ref_iter: u32,
    cap: u32,
    scale: i32,
    b_scale: i32,
}

@group(0) @binding(1) var<storage, read_write> pixels: array<Pixel>;
@group(0) @binding(2) var<storage, read> orbit: array<vec2<f32>>;

const REBASE_MIN_Z: f32 = 1e-13;
const SCALE_WINDOW: i32 = 10;

fn cldexp(a: vec2<f32>, e: i32) -> vec2<f32> {
    return vec2<f32>(ldexp(a.x, e), ldexp(a.y, e));
}

fn exponent_of(x: f32) -> i32 {
    return frexp(x).exp - 1;
}

@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let i = gid.x;
    if (i >= params.n) { return; }
    var px = pixels[i];
    if (px.nn != 0) { return; }

    var it = params.chunk_start;
    for (var s = 0u; s < params.chunk_len; s = s + 1u) {
        it = it + 1u;
        var m = px.ref_iter;
        if (m + 1u >= params.orbit_len) {
            if (params.ref_escaped == 1u && m < params.orbit_len) {
                let z = orbit[m] + cldexp(px.delta, px.scale);
                let a = cheb(z);
                if (a == 0.0) {
                    px.delta = vec2<f32>(0.0, 0.0);
                    px.scale = params.initial_scale;
                } else {
                    let e = max(exponent_of(a), params.initial_scale);
                    px.delta = cldexp(z, -e);
                    px.scale = e;
                }
                px.ref_iter = 0u;
                m = 0u;
            } else {
                px.nn = i32(it);
                px.b = cldexp(px.delta, px.scale);
                break;
            }
        }
        let zm = orbit[m];

        // Scaled Horner: w carries the 2^scale factor so term k implicitly
        // carries 2^((k-1)*scale); the all-delta term may underflow and
        // vanish harmlessly.
        let w = cldexp(px.delta, px.scale);
        var acc = vec2<f32>(1.0, 0.0);
        var coeff = 1.0;
        var zp = vec2<f32>(1.0, 0.0);
        for (var k = params.exponent - 1u; k >= 1u; k = k - 1u) {
            zp = cmul(zp, zm);
            coeff = coeff * f32(k + 1u) / f32(params.exponent - k);
            acc = cmul(acc, w) + coeff * zp;
        }
        var dn = cmul(px.delta, acc) + cldexp(px.dc, params.initial_scale - px.scale);

        var s_new = px.scale;
        var a = cheb(dn);
        while (a >= 2.0) {
            dn = dn * 0.5;
            s_new = s_new + 1;
            a = cheb(dn);
        }
        while (a != 0.0 && a < 0.5 && s_new > params.initial_scale) {
            dn = dn * 2.0;
            s_new = s_new - 1;
            a = cheb(dn);
        }

        let d_actual = cldexp(dn, s_new);
        let zn = orbit[m + 1u] + d_actual;
        if (dot(zn, zn) > 4.0) {
            px.nn = i32(it);
            px.b = zn;
            break;
        }

        let zc = cheb(zn);
        if (zc > REBASE_MIN_Z && zc < 2.0 * cheb(d_actual)) {
            let e = max(exponent_of(zc), params.initial_scale);
            px.delta = cldexp(zn, -e);
            px.scale = e;
            px.ref_iter = 0u;
        } else {
            px.delta = dn;
            px.scale = s_new;
            px.ref_iter = m + 1u;
        }

        var finished = false;
        if (px.scale <= params.initial_scale + SCALE_WINDOW) {
            if (px.has_cp == 1u && px.b_scale <= params.initial_scale + SCALE_WINDOW) {
                let common_scale = max(px.scale, px.b_scale);
                let ca = cldexp(px.delta, px.scale - common_scale);
                let cb = cldexp(px.b, px.b_scale - common_scale);
                let d = abs(ca.x - cb.x) + abs(ca.y - cb.y);
                let e1 = ldexp(params.eps1, params.initial_scale - common_scale);
                let e2 = ldexp(params.eps2, params.initial_scale - common_scale);
                if (d <= e1) {
                    finished = true;
                    if (px.period == 0u) { px.period = it - px.cp_iter; }
                } else if (d <= e2 && px.period == 0u) {
                    px.period = it - px.cp_iter;
                }
            }
            if (!finished && snapshot_due(it)) {
                px.b = px.delta;
                px.b_scale = px.scale;
                px.has_cp = 1u;
                px.cp_iter = it;
                px.period = 0u;
            }
        }
        if (!finished && it >= px.cap) {
            finished = true;
        }
        if (finished) {
            px.nn = -i32(it);
            px.b = zn;
            break;
        }
    }
    pixels[i] = px;
}
"#;

pub(crate) fn shallow_source() -> String {
    format!("{PREAMBLE}{SHALLOW_BODY}")
}

pub(crate) fn perturb_source() -> String {
    format!("{PREAMBLE}{PERTURB_BODY}")
}

pub(crate) fn adaptive_source() -> String {
    format!("{PREAMBLE}{ADAPTIVE_BODY}")
}
