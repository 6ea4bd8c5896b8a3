//! terraform functions known to the loader
//!
//! Only pure functions that commonly show up in resource arguments are provided. Calls to any
//! other function fail evaluation, which leaves the attribute `null`.
use hcl::eval::{Context, FuncArgs, FuncDef, ParamType};
use hcl::Value;
use std::net::Ipv4Addr;

pub fn declare_functions(context: &mut Context) {
    context.declare_func(
        "cidrsubnet",
        FuncDef::new(
            cidrsubnet,
            [ParamType::String, ParamType::Number, ParamType::Number],
        ),
    );
    context.declare_func(
        "concat",
        FuncDef::builder()
            .variadic_param(ParamType::array_of(ParamType::Any))
            .build(concat),
    );
    context.declare_func(
        "join",
        FuncDef::new(
            join,
            [ParamType::String, ParamType::array_of(ParamType::String)],
        ),
    );
    context.declare_func("length", FuncDef::new(length, [ParamType::Any]));
    context.declare_func("lower", FuncDef::new(lower, [ParamType::String]));
    context.declare_func("upper", FuncDef::new(upper, [ParamType::String]));
    context.declare_func(
        "max",
        FuncDef::builder()
            .param(ParamType::Number)
            .variadic_param(ParamType::Number)
            .build(max),
    );
    context.declare_func(
        "min",
        FuncDef::builder()
            .param(ParamType::Number)
            .variadic_param(ParamType::Number)
            .build(min),
    );
}

fn str_arg(args: &FuncArgs, pos: usize) -> Result<&str, String> {
    args[pos]
        .as_str()
        .ok_or_else(|| format!("expected string at position {pos}"))
}

fn int_arg(args: &FuncArgs, pos: usize) -> Result<i64, String> {
    args[pos]
        .as_f64()
        .map(|num| num.trunc() as i64)
        .ok_or_else(|| format!("expected number at position {pos}"))
}

/// IPv4 only: `cidrsubnet("10.0.0.0/16", 8, 2)` is `10.0.2.0/24`
fn cidrsubnet(args: FuncArgs) -> Result<Value, String> {
    let prefix = str_arg(&args, 0)?;
    let newbits = int_arg(&args, 1)?;
    let netnum = int_arg(&args, 2)?;

    let (addr, len) = prefix
        .split_once('/')
        .ok_or_else(|| format!("invalid CIDR address {prefix:?}"))?;
    let addr: Ipv4Addr = addr
        .parse()
        .map_err(|err| format!("invalid CIDR address {prefix:?}: {err}"))?;
    let len: u32 = len
        .parse()
        .ok()
        .filter(|len| *len <= 32)
        .ok_or_else(|| format!("invalid prefix length in {prefix:?}"))?;

    let new_len = u32::try_from(newbits)
        .ok()
        .map(|newbits| len + newbits)
        .filter(|new_len| *new_len <= 32)
        .ok_or_else(|| format!("cannot extend prefix {prefix:?} by {newbits} bits"))?;
    let subnets = 1u64 << (new_len - len);
    let netnum = u64::try_from(netnum)
        .ok()
        .filter(|netnum| *netnum < subnets)
        .ok_or_else(|| format!("prefix extension of {newbits} bits has no network {netnum}"))?;

    let mask = u32::MAX.checked_shl(32 - len).unwrap_or(0);
    let network = u32::from(addr) & mask;
    let subnet = (netnum as u32).checked_shl(32 - new_len).unwrap_or(0);

    Ok(Value::from(format!(
        "{}/{new_len}",
        Ipv4Addr::from(network | subnet)
    )))
}

fn concat(args: FuncArgs) -> Result<Value, String> {
    let values = args
        .iter()
        .filter_map(Value::as_array)
        .flatten()
        .cloned()
        .collect();
    Ok(Value::Array(values))
}

fn join(args: FuncArgs) -> Result<Value, String> {
    let separator = str_arg(&args, 0)?;
    let parts: Vec<&str> = args[1]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .collect();
    Ok(Value::from(parts.join(separator)))
}

fn length(args: FuncArgs) -> Result<Value, String> {
    let length = match &args[0] {
        Value::Array(array) => array.len(),
        Value::Object(object) => object.len(),
        Value::String(s) => s.chars().count(),
        other => return Err(format!("cannot take the length of `{other}`")),
    };
    Ok(Value::from(length as u64))
}

fn lower(args: FuncArgs) -> Result<Value, String> {
    Ok(Value::from(str_arg(&args, 0)?.to_lowercase()))
}

fn upper(args: FuncArgs) -> Result<Value, String> {
    Ok(Value::from(str_arg(&args, 0)?.to_uppercase()))
}

fn max(args: FuncArgs) -> Result<Value, String> {
    extreme(args, |candidate, current| candidate > current)
}

fn min(args: FuncArgs) -> Result<Value, String> {
    extreme(args, |candidate, current| candidate < current)
}

/// Keeps the original number so integers stay integers
fn extreme(args: FuncArgs, replaces: fn(f64, f64) -> bool) -> Result<Value, String> {
    let mut best: Option<(f64, &Value)> = None;

    for value in args.iter() {
        let Some(num) = value.as_f64() else {
            return Err(format!("expected number, got `{value}`"));
        };
        match best {
            Some((current, _)) if !replaces(num, current) => {}
            _ => best = Some((num, value)),
        }
    }

    best.map(|(_, value)| value.clone())
        .ok_or_else(|| "expected at least one number".to_owned())
}
