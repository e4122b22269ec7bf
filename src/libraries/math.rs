use crate::context::{ContextRef, ObjectKind};
use crate::error::{Result, ScriptError};
use crate::evaluator::evaluate;
use crate::executer::Executer;
use crate::frame::{Frame, Library};
use crate::value::Value;
use rand::Rng;
use std::f64::consts;

/// Everything but `EVAL`, which is also what an `EVAL` expression can see.
pub const FUNCTIONS: Library = &[
    ("POW", pow),
    ("IPART", ipart),
    ("FPART", fpart),
    ("ROUND", round),
    ("RANDOM", random),
    ("ABS", abs),
    ("SIN", sin),
    ("ASIN", asin),
    ("SINH", sinh),
    ("COS", cos),
    ("ACOS", acos),
    ("COSH", cosh),
    ("TAN", tan),
    ("ATAN", atan),
    ("TANH", tanh),
    ("LOG", log),
    ("LN", ln),
];

const EVAL: Library = &[("EVAL", eval)];

const CONSTANTS: &[(&str, f64)] = &[("@PI", consts::PI), ("@E", consts::E)];

pub fn install(global: &ContextRef) -> Result<()> {
    install_pure(global)?;
    global.add_library(EVAL)
}

fn install_pure(global: &ContextRef) -> Result<()> {
    global.add_library(FUNCTIONS)?;
    for (name, value) in CONSTANTS {
        if global.lookup(name, ObjectKind::Constant)?.is_none() {
            global.set_constant(name, Value::Double(*value))?;
        }
    }
    Ok(())
}

fn unary(frame: &mut Frame<'_>, f: fn(f64) -> f64) -> Result<()> {
    frame.assert_args(2)?;
    let x = frame.get_f64(1)?;
    frame.set_result(f(x));
    Ok(())
}

fn pow(frame: &mut Frame<'_>) -> Result<()> {
    frame.assert_args(3)?;
    let (base, exponent) = (frame.get_f64(1)?, frame.get_f64(2)?);
    frame.set_result(base.powf(exponent));
    Ok(())
}

fn ipart(frame: &mut Frame<'_>) -> Result<()> {
    unary(frame, f64::trunc)
}

fn fpart(frame: &mut Frame<'_>) -> Result<()> {
    unary(frame, f64::fract)
}

/// `ROUND(x [, places])`, two places by default, ties to even.
fn round(frame: &mut Frame<'_>) -> Result<()> {
    frame.assert_args_between(2, 3)?;
    let x = frame.get_f64(1)?;
    let places = if frame.len() == 3 { frame.get_int(2)? } else { 2 };
    if !(0..=15).contains(&places) {
        return Err(ScriptError::Argument("ROUND takes between 0 and 15 places".into()));
    }
    let scale = 10f64.powi(places as i32);
    frame.set_result((x * scale).round_ties_even() / scale);
    Ok(())
}

fn random(frame: &mut Frame<'_>) -> Result<()> {
    frame.assert_args(1)?;
    frame.set_result(Value::Double(rand::thread_rng().gen::<f64>()));
    Ok(())
}

fn abs(frame: &mut Frame<'_>) -> Result<()> {
    unary(frame, f64::abs)
}

fn sin(frame: &mut Frame<'_>) -> Result<()> {
    unary(frame, f64::sin)
}

fn asin(frame: &mut Frame<'_>) -> Result<()> {
    unary(frame, f64::asin)
}

fn sinh(frame: &mut Frame<'_>) -> Result<()> {
    unary(frame, f64::sinh)
}

fn cos(frame: &mut Frame<'_>) -> Result<()> {
    unary(frame, f64::cos)
}

fn acos(frame: &mut Frame<'_>) -> Result<()> {
    unary(frame, f64::acos)
}

fn cosh(frame: &mut Frame<'_>) -> Result<()> {
    unary(frame, f64::cosh)
}

fn tan(frame: &mut Frame<'_>) -> Result<()> {
    unary(frame, f64::tan)
}

fn atan(frame: &mut Frame<'_>) -> Result<()> {
    unary(frame, f64::atan)
}

fn tanh(frame: &mut Frame<'_>) -> Result<()> {
    unary(frame, f64::tanh)
}

fn log(frame: &mut Frame<'_>) -> Result<()> {
    unary(frame, f64::log10)
}

fn ln(frame: &mut Frame<'_>) -> Result<()> {
    unary(frame, f64::ln)
}

/// Evaluates a string in a throwaway executer that only knows the math
/// functions. Failures set status 1 instead of propagating.
fn eval(frame: &mut Frame<'_>) -> Result<()> {
    frame.assert_args(2)?;
    let source = frame.get_str(1)?;
    let mut isolated = Executer::new();
    install_pure(&isolated.global())?;
    match evaluate(&source, &mut isolated) {
        Ok(value) => frame.set_result(value),
        Err(err) => {
            tracing::debug!(%source, error = %err, "EVAL failed");
            frame.status = 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(source: &str) -> Value {
        let mut exec = Executer::new();
        install(&exec.global()).unwrap();
        exec.execute(source).unwrap()
    }

    #[test]
    fn integer_and_fractional_parts() {
        assert_eq!(run("IPART(3.75)"), Value::Int(3));
        assert_eq!(run("IPART(-3.75)"), Value::Int(-3));
        assert_eq!(run("FPART(2.5)"), Value::Double(0.5));
    }

    #[test]
    fn round_defaults_to_two_places() {
        assert_eq!(run("ROUND(3.14159)"), Value::Double(3.14));
        assert_eq!(run("ROUND(2.5, 0)"), Value::Int(2));
        assert_eq!(run("ROUND(3.14159, 3)"), Value::Double(3.142));
    }

    #[test]
    fn pow_and_logs() {
        assert_eq!(run("POW(2, 10)"), Value::Int(1024));
        assert_eq!(run("LOG(1000)"), Value::Int(3));
        assert_eq!(run("LN(1)"), Value::Int(0));
        assert_eq!(run("ABS(-4)"), Value::Int(4));
    }

    #[test]
    fn constants_are_installed() {
        assert_eq!(run("@PI"), Value::Double(consts::PI));
        let mut exec = Executer::new();
        install(&exec.global()).unwrap();
        install(&exec.global()).unwrap();
        let err = exec.execute("CONST @PI = 3").unwrap_err();
        assert!(matches!(err.root(), ScriptError::ConstantChange(_)));
    }

    #[test]
    fn random_stays_in_unit_interval() {
        for _ in 0..20 {
            let x = run("RANDOM()").to_f64().unwrap();
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn eval_is_isolated() {
        assert_eq!(run(r#"EVAL("2 * POW(3, 2)")"#), Value::Int(18));

        let mut exec = Executer::new();
        install(&exec.global()).unwrap();
        exec.execute("x$ = 5").unwrap();
        assert!(exec.execute(r#"EVAL("x$ + 1")"#).unwrap().is_null());
        assert!(exec.execute(r#"EVAL("EVAL(1)")"#).unwrap().is_null());
    }
}
