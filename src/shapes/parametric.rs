//! User-defined parametric surfaces.
//!
//! Three formulas give x, y and z in terms of `t` in `[0, 2π]` and `s` in
//! `[0, π]`. Any sample that fails to evaluate, or evaluates to a non-finite
//! number, falls back to the default torus at that (t, s).

use crate::geometry::{primitives, MeshData};
use evalexpr::{
    build_operator_tree, ContextWithMutableFunctions, ContextWithMutableVariables, EvalexprError,
    Function, HashMapContext, Node, Value,
};
use glam::Vec3;
use std::f64::consts::PI;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParametricFormula {
    pub x: String,
    pub y: String,
    pub z: String,
}

impl Default for ParametricFormula {
    fn default() -> Self {
        Self {
            x: "(2 + cos(s)) * cos(t)".to_string(),
            y: "(2 + cos(s)) * sin(t)".to_string(),
            z: "sin(s)".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FormulaError {
    #[error("{axis}: {source}")]
    Parse {
        axis: char,
        #[source]
        source: EvalexprError,
    },
    #[error("{axis} at t={t:.3}, s={s:.3}: {source}")]
    Eval {
        axis: char,
        t: f64,
        s: f64,
        #[source]
        source: EvalexprError,
    },
    #[error("{axis} at t={t:.3}, s={s:.3} is not a finite number")]
    NonFinite { axis: char, t: f64, s: f64 },
}

pub fn default_torus(t: f64, s: f64) -> Vec3 {
    Vec3::new(
        ((2.0 + s.cos()) * t.cos()) as f32,
        ((2.0 + s.cos()) * t.sin()) as f32,
        s.sin() as f32,
    )
}

fn unary(f: fn(f64) -> f64) -> Function {
    Function::new(move |argument: &Value| Ok(Value::Float(f(argument.as_number()?))))
}

fn math_context() -> Result<HashMapContext, EvalexprError> {
    let mut context = HashMapContext::new();
    context.set_function("sin".into(), unary(f64::sin))?;
    context.set_function("cos".into(), unary(f64::cos))?;
    context.set_function("tan".into(), unary(f64::tan))?;
    context.set_function("sqrt".into(), unary(f64::sqrt))?;
    context.set_function("abs".into(), unary(f64::abs))?;
    context.set_function(
        "pow".into(),
        Function::new(|argument: &Value| {
            let args = argument.as_fixed_len_tuple(2)?;
            Ok(Value::Float(args[0].as_number()?.powf(args[1].as_number()?)))
        }),
    )?;
    context.set_value("pi".into(), Value::Float(PI))?;
    Ok(context)
}

/// Parsed formulas plus an evaluation context with the math functions bound.
pub struct CompiledFormula {
    axes: [(char, Node); 3],
    context: HashMapContext,
}

impl CompiledFormula {
    pub fn compile(formula: &ParametricFormula) -> Result<Self, FormulaError> {
        let parse = |axis: char, text: &str| {
            build_operator_tree(text)
                .map(|node| (axis, node))
                .map_err(|source| FormulaError::Parse { axis, source })
        };
        let axes = [
            parse('x', &formula.x)?,
            parse('y', &formula.y)?,
            parse('z', &formula.z)?,
        ];
        let context = math_context().map_err(|source| FormulaError::Parse { axis: 'x', source })?;
        Ok(Self { axes, context })
    }

    pub fn eval(&mut self, t: f64, s: f64) -> Result<Vec3, FormulaError> {
        let bind = |context: &mut HashMapContext, name: &str, value: f64| {
            context
                .set_value(name.into(), Value::Float(value))
                .map_err(|source| FormulaError::Eval { axis: '-', t, s, source })
        };
        bind(&mut self.context, "t", t)?;
        bind(&mut self.context, "s", s)?;

        let mut out = [0.0f32; 3];
        for (slot, (axis, node)) in out.iter_mut().zip(&self.axes) {
            let value = node
                .eval_number_with_context(&self.context)
                .map_err(|source| FormulaError::Eval { axis: *axis, t, s, source })?;
            if !value.is_finite() {
                return Err(FormulaError::NonFinite { axis: *axis, t, s });
            }
            *slot = value as f32;
        }
        Ok(Vec3::from(out))
    }
}

/// Surface sampled on a `segments x segments` grid, plus the first error met
/// (if any) so the UI can show why parts fell back to the torus.
pub fn build_surface(formula: &ParametricFormula, segments: u32) -> (MeshData, Option<FormulaError>) {
    let mut first_error = None;
    let mut compiled = match CompiledFormula::compile(formula) {
        Ok(compiled) => Some(compiled),
        Err(err) => {
            log::warn!("Parametric formula rejected, using default torus: {}", err);
            first_error = Some(err);
            None
        }
    };

    let mesh = primitives::parametric(segments, segments, |u, v| {
        let t = u as f64 * PI * 2.0;
        let s = v as f64 * PI;
        let Some(compiled) = compiled.as_mut() else {
            return default_torus(t, s);
        };
        match compiled.eval(t, s) {
            Ok(point) => point,
            Err(err) => {
                if first_error.is_none() {
                    log::warn!("Parametric sample fell back to torus: {}", err);
                    first_error = Some(err);
                }
                default_torus(t, s)
            }
        }
    });
    (mesh, first_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formula(x: &str, y: &str, z: &str) -> ParametricFormula {
        ParametricFormula {
            x: x.into(),
            y: y.into(),
            z: z.into(),
        }
    }

    #[test]
    fn default_formula_matches_torus() {
        let mut compiled = CompiledFormula::compile(&ParametricFormula::default()).unwrap();
        for (t, s) in [(0.0, 0.0), (1.0, 0.5), (4.0, 3.0)] {
            let p = compiled.eval(t, s).unwrap();
            assert!((p - default_torus(t, s)).length() < 1e-5);
        }
    }

    #[test]
    fn pow_and_pi_are_available() {
        let mut compiled = CompiledFormula::compile(&formula("pow(t, 2)", "pi", "abs(0 - s)")).unwrap();
        let p = compiled.eval(3.0, 2.0).unwrap();
        assert_eq!(p, Vec3::new(9.0, std::f32::consts::PI, 2.0));
    }

    #[test]
    fn parse_errors_fall_back_to_torus() {
        let (mesh, error) = build_surface(&formula("cos(t", "0", "0"), 8);
        assert!(matches!(error, Some(FormulaError::Parse { axis: 'x', .. })));
        let (torus, none) = build_surface(&ParametricFormula::default(), 8);
        assert!(none.is_none());
        assert_eq!(mesh.positions.len(), torus.positions.len());
        for (a, b) in mesh.positions.iter().zip(&torus.positions) {
            assert!((Vec3::from(*a) - Vec3::from(*b)).length() < 1e-5);
        }
    }

    #[test]
    fn failing_samples_fall_back_individually() {
        // sqrt of a negative is NaN for t > π
        let (mesh, error) = build_surface(&formula("sqrt(pi - t)", "0", "s"), 4);
        assert!(matches!(error, Some(FormulaError::NonFinite { axis: 'x', .. })));
        let origin_side = mesh.positions.iter().filter(|p| p[1] == 0.0).count();
        assert!(origin_side > 0);
        assert!(mesh.positions.iter().all(|p| p.iter().all(|c| c.is_finite())));
    }

    #[test]
    fn unknown_variables_are_errors() {
        let mut compiled = CompiledFormula::compile(&formula("q", "0", "0")).unwrap();
        assert!(matches!(compiled.eval(0.0, 0.0), Err(FormulaError::Eval { axis: 'x', .. })));
    }
}
