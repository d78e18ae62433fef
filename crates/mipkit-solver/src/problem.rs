use std::ops::{Add, Mul, Neg, Sub};

use thiserror::Error;

use crate::solution::ConstraintViolation;

/// Handle to a variable declared on a [`MipProblem`]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Continuous,
    Integer,
    /// Integer restricted to `{0, 1}`
    Boolean,
}

impl VarKind {
    pub fn is_integral(self) -> bool {
        !matches!(self, VarKind::Continuous)
    }
}

/// A declared decision variable
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Name used in reports and diagnostics
    pub name: String,
    pub kind: VarKind,
    /// Lower bound, may be `f64::NEG_INFINITY`
    pub lower: f64,
    /// Upper bound, may be `f64::INFINITY`
    pub upper: f64,
}

/// Affine combination of variables: `sum(coef * var) + constant`
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, f64)>,
    pub constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// Sum of the given variables, each with coefficient 1
    pub fn sum(vars: impl IntoIterator<Item = VarId>) -> Self {
        Self {
            terms: vars.into_iter().map(|v| (v, 1.0)).collect(),
            constant: 0.0,
        }
    }

    /// Weighted sum `sum(coef * var)`
    pub fn weighted(terms: impl IntoIterator<Item = (VarId, f64)>) -> Self {
        Self {
            terms: terms.into_iter().collect(),
            constant: 0.0,
        }
    }

    pub fn add_term(&mut self, var: VarId, coefficient: f64) {
        self.terms.push((var, coefficient));
    }

    /// Evaluate the expression against a full assignment of variable values
    pub fn eval(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(v, c)| c * values.get(v.index()).copied().unwrap_or(0.0))
            .sum::<f64>()
            + self.constant
    }

    fn scaled(mut self, factor: f64) -> Self {
        for (_, c) in &mut self.terms {
            *c *= factor;
        }
        self.constant *= factor;
        self
    }
}

impl From<VarId> for LinearExpr {
    fn from(var: VarId) -> Self {
        Self {
            terms: vec![(var, 1.0)],
            constant: 0.0,
        }
    }
}

impl From<f64> for LinearExpr {
    fn from(value: f64) -> Self {
        Self::constant(value)
    }
}

impl<T: Into<LinearExpr>> Add<T> for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: T) -> LinearExpr {
        let rhs = rhs.into();
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
        self
    }
}

impl<T: Into<LinearExpr>> Sub<T> for LinearExpr {
    type Output = LinearExpr;

    fn sub(self, rhs: T) -> LinearExpr {
        self + rhs.into().scaled(-1.0)
    }
}

impl Mul<f64> for LinearExpr {
    type Output = LinearExpr;

    fn mul(self, rhs: f64) -> LinearExpr {
        self.scaled(rhs)
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(self) -> LinearExpr {
        self.scaled(-1.0)
    }
}

impl<T: Into<LinearExpr>> Add<T> for VarId {
    type Output = LinearExpr;

    fn add(self, rhs: T) -> LinearExpr {
        LinearExpr::from(self) + rhs
    }
}

impl<T: Into<LinearExpr>> Sub<T> for VarId {
    type Output = LinearExpr;

    fn sub(self, rhs: T) -> LinearExpr {
        LinearExpr::from(self) - rhs
    }
}

impl Mul<f64> for VarId {
    type Output = LinearExpr;

    fn mul(self, rhs: f64) -> LinearExpr {
        LinearExpr::weighted([(self, rhs)])
    }
}

impl Mul<VarId> for f64 {
    type Output = LinearExpr;

    fn mul(self, rhs: VarId) -> LinearExpr {
        LinearExpr::weighted([(rhs, self)])
    }
}

/// Objective function
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct Objective {
    pub expr: LinearExpr,
    /// Whether to minimize or maximize
    pub minimize: bool,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Constraint {
    /// Name/label for the constraint (for diagnostics)
    pub name: String,
    /// Left-hand side, constant-free
    pub expr: LinearExpr,
    /// Comparison operator
    pub op: ConstraintOp,
    /// Right-hand side value
    pub rhs: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (=)
    Eq,
}

/// Reason a problem cannot be handed to a backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemDefect {
    #[error("variable {0} has lower bound above upper bound")]
    InvertedBounds(String),
    #[error("variable {0} has a NaN bound")]
    NanBound(String),
    #[error("{constraint} references undeclared variable #{index}")]
    UnknownVariable { constraint: String, index: usize },
    #[error("{0} has a non-finite coefficient")]
    NonFiniteCoefficient(String),
}

/// A linear or mixed-integer program, independent of any backend
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct MipProblem {
    pub variables: Vec<Variable>,
    pub objective: Objective,
    pub constraints: Vec<Constraint>,
}

impl MipProblem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_variable(&mut self, name: impl Into<String>, kind: VarKind, lower: f64, upper: f64) -> VarId {
        let (lower, upper) = match kind {
            VarKind::Boolean => (lower.max(0.0), upper.min(1.0)),
            _ => (lower, upper),
        };
        self.variables.push(Variable {
            name: name.into(),
            kind,
            lower,
            upper,
        });
        VarId(self.variables.len() - 1)
    }

    pub fn continuous(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> VarId {
        self.add_variable(name, VarKind::Continuous, lower, upper)
    }

    pub fn integer(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> VarId {
        self.add_variable(name, VarKind::Integer, lower, upper)
    }

    pub fn boolean(&mut self, name: impl Into<String>) -> VarId {
        self.add_variable(name, VarKind::Boolean, 0.0, 1.0)
    }

    /// Add `lhs op rhs`. Both sides may mix variables and constants; the
    /// stored constraint keeps variables on the left and the constant on the right.
    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        lhs: impl Into<LinearExpr>,
        op: ConstraintOp,
        rhs: impl Into<LinearExpr>,
    ) {
        let mut expr = lhs.into() - rhs.into();
        let rhs = -expr.constant;
        expr.constant = 0.0;
        self.constraints.push(Constraint {
            name: name.into(),
            expr,
            op,
            rhs,
        });
    }

    pub fn maximize(&mut self, expr: impl Into<LinearExpr>) {
        self.objective = Objective {
            expr: expr.into(),
            minimize: false,
        };
    }

    pub fn minimize(&mut self, expr: impl Into<LinearExpr>) {
        self.objective = Objective {
            expr: expr.into(),
            minimize: true,
        };
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn num_integral(&self) -> usize {
        self.variables.iter().filter(|v| v.kind.is_integral()).count()
    }

    pub fn variable(&self, id: VarId) -> Option<&Variable> {
        self.variables.get(id.index())
    }

    pub fn find_variable(&self, name: &str) -> Option<VarId> {
        self.variables.iter().position(|v| v.name == name).map(VarId)
    }

    /// Check the problem is well formed before it reaches a backend
    pub fn validate(&self) -> Result<(), ProblemDefect> {
        for v in &self.variables {
            if v.lower.is_nan() || v.upper.is_nan() {
                return Err(ProblemDefect::NanBound(v.name.clone()));
            }
            if v.lower > v.upper {
                return Err(ProblemDefect::InvertedBounds(v.name.clone()));
            }
        }

        let n = self.variables.len();
        let check_expr = |label: &str, expr: &LinearExpr| -> Result<(), ProblemDefect> {
            for &(var, coef) in &expr.terms {
                if var.index() >= n {
                    return Err(ProblemDefect::UnknownVariable {
                        constraint: label.to_string(),
                        index: var.index(),
                    });
                }
                if !coef.is_finite() {
                    return Err(ProblemDefect::NonFiniteCoefficient(label.to_string()));
                }
            }
            Ok(())
        };

        check_expr("objective", &self.objective.expr)?;
        for c in &self.constraints {
            check_expr(&c.name, &c.expr)?;
            if !c.rhs.is_finite() {
                return Err(ProblemDefect::NonFiniteCoefficient(c.name.clone()));
            }
        }
        Ok(())
    }

    /// Find which constraints and bounds a given assignment violates, worst first
    pub fn violations(&self, values: &[f64], tolerance: f64) -> Vec<ConstraintViolation> {
        let mut violations = Vec::new();

        for (v, &value) in self.variables.iter().zip(values) {
            if value < v.lower - tolerance {
                let amt = v.lower - value;
                violations.push(ConstraintViolation {
                    constraint: format!("{}_lower", v.name),
                    required: v.lower,
                    actual: value,
                    violation_amount: amt,
                    description: format!("{} is below its lower bound {:.2} by {:.2}", v.name, v.lower, amt),
                });
            }
            if value > v.upper + tolerance {
                let amt = value - v.upper;
                violations.push(ConstraintViolation {
                    constraint: format!("{}_upper", v.name),
                    required: v.upper,
                    actual: value,
                    violation_amount: amt,
                    description: format!("{} exceeds its upper bound {:.2} by {:.2}", v.name, v.upper, amt),
                });
            }
            if v.kind.is_integral() && (value - value.round()).abs() > tolerance {
                violations.push(ConstraintViolation {
                    constraint: format!("{}_integral", v.name),
                    required: value.round(),
                    actual: value,
                    violation_amount: (value - value.round()).abs(),
                    description: format!("{} must be integral but is {}", v.name, value),
                });
            }
        }

        for c in &self.constraints {
            let lhs = c.expr.eval(values);

            let (is_violated, violation_amount, description) = match c.op {
                ConstraintOp::Le => {
                    if lhs > c.rhs + tolerance {
                        let amt = lhs - c.rhs;
                        (true, amt, format!("{} exceeds maximum of {:.2} by {:.2}", c.name, c.rhs, amt))
                    } else {
                        (false, 0.0, String::new())
                    }
                }
                ConstraintOp::Ge => {
                    if lhs < c.rhs - tolerance {
                        let amt = c.rhs - lhs;
                        (true, amt, format!("{} is below minimum of {:.2} by {:.2}", c.name, c.rhs, amt))
                    } else {
                        (false, 0.0, String::new())
                    }
                }
                ConstraintOp::Eq => {
                    let diff = (lhs - c.rhs).abs();
                    if diff > tolerance {
                        (true, diff, format!("{} requires exactly {:.2} but got {:.2}", c.name, c.rhs, lhs))
                    } else {
                        (false, 0.0, String::new())
                    }
                }
            };

            if is_violated {
                violations.push(ConstraintViolation {
                    constraint: c.name.clone(),
                    required: c.rhs,
                    actual: lhs,
                    violation_amount,
                    description,
                });
            }
        }

        violations.sort_by(|a, b| b.violation_amount.total_cmp(&a.violation_amount));
        violations
    }
}
