//! Solver-agnostic ILP model and backend interface.
//!
//! The clustering formulation only ever talks to an [`IlpBackend`]: it
//! builds an [`IlpModel`] (binary variables, linear constraints, a linear
//! objective, an optional warm start), picks a [`SolveConfig`], and reads a
//! value per variable back from the [`Solution`]. Any MILP engine can sit
//! behind the trait without the formulation changing.
//!
//! The bundled [`ExhaustiveBackend`] is a reference implementation for
//! small instances: it propagates single-variable fixings and two-variable
//! equalities, then enumerates the remaining free variables. It exists so
//! the formulation is testable without an external solver; production use
//! wants a real MILP engine behind the same trait.

use std::collections::HashMap;
use std::io::{self, Write};
use std::time::{Duration, Instant};

use petgraph::unionfind::UnionFind;

use crate::error::{Error, Result};

/// Variable handle within an [`IlpModel`].
pub type VarId = usize;

/// Linear expression: a sum of `coef * var` terms plus a constant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinExpr {
    /// Weighted variables.
    pub terms: Vec<(f64, VarId)>,
    /// Constant offset.
    pub constant: f64,
}

impl LinExpr {
    /// Empty expression.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `coef * var`, builder style.
    pub fn term(mut self, coef: f64, var: VarId) -> Self {
        self.terms.push((coef, var));
        self
    }

    /// Add `coef * var` in place.
    pub fn add_term(&mut self, coef: f64, var: VarId) {
        self.terms.push((coef, var));
    }

    /// Evaluate under a full variable assignment.
    pub fn eval(&self, values: &[f64]) -> f64 {
        self.constant
            + self
                .terms
                .iter()
                .map(|&(coef, var)| coef * values[var])
                .sum::<f64>()
    }
}

/// Constraint sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    /// `expr <= rhs`
    Le,
    /// `expr >= rhs`
    Ge,
    /// `expr == rhs`
    Eq,
}

/// A linear constraint `expr (sense) rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinConstraint {
    /// Left-hand side.
    pub expr: LinExpr,
    /// Sense.
    pub sense: Sense,
    /// Right-hand side.
    pub rhs: f64,
}

/// Objective direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Maximize the objective.
    Maximize,
    /// Minimize the objective.
    Minimize,
}

/// A 0/1 integer program.
#[derive(Debug, Clone, Default)]
pub struct IlpModel {
    n_vars: usize,
    constraints: Vec<LinConstraint>,
    objective: LinExpr,
    direction: Option<Direction>,
    warm_start: Option<Vec<(VarId, f64)>>,
}

impl IlpModel {
    /// Empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binary variable and return its handle.
    pub fn add_binary(&mut self) -> VarId {
        let var = self.n_vars;
        self.n_vars += 1;
        var
    }

    /// Number of variables.
    pub fn n_vars(&self) -> usize {
        self.n_vars
    }

    /// Add a linear constraint.
    pub fn add_constraint(&mut self, expr: LinExpr, sense: Sense, rhs: f64) {
        self.constraints.push(LinConstraint { expr, sense, rhs });
    }

    /// Fix a variable to a value (a single-term equality constraint).
    pub fn fix(&mut self, var: VarId, value: f64) {
        self.add_constraint(LinExpr::new().term(1.0, var), Sense::Eq, value);
    }

    /// The constraints.
    pub fn constraints(&self) -> &[LinConstraint] {
        &self.constraints
    }

    /// Set the objective.
    pub fn set_objective(&mut self, expr: LinExpr, direction: Direction) {
        self.objective = expr;
        self.direction = Some(direction);
    }

    /// The objective expression.
    pub fn objective(&self) -> (&LinExpr, Option<Direction>) {
        (&self.objective, self.direction)
    }

    /// Provide an initial assignment used as warm start by backends that
    /// support one.
    pub fn set_warm_start(&mut self, assignment: Vec<(VarId, f64)>) {
        self.warm_start = Some(assignment);
    }

    /// The warm start, if any.
    pub fn warm_start(&self) -> Option<&[(VarId, f64)]> {
        self.warm_start.as_deref()
    }

    /// Serialize the model as LP-format text, for offline inspection.
    pub fn write_lp<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "\\ idem ILP model: {} binary variables", self.n_vars)?;
        match self.direction {
            Some(Direction::Minimize) => writeln!(w, "Minimize")?,
            _ => writeln!(w, "Maximize")?,
        }
        write!(w, " obj:")?;
        write_expr(w, &self.objective)?;
        writeln!(w)?;
        writeln!(w, "Subject To")?;
        for (i, c) in self.constraints.iter().enumerate() {
            write!(w, " c{i}:")?;
            write_expr(w, &c.expr)?;
            let sense = match c.sense {
                Sense::Le => "<=",
                Sense::Ge => ">=",
                Sense::Eq => "=",
            };
            writeln!(w, " {} {}", sense, c.rhs - c.expr.constant)?;
        }
        writeln!(w, "Binaries")?;
        for var in 0..self.n_vars {
            write!(w, " x{var}")?;
        }
        writeln!(w)?;
        writeln!(w, "End")
    }
}

fn write_expr<W: Write>(w: &mut W, expr: &LinExpr) -> io::Result<()> {
    if expr.terms.is_empty() {
        write!(w, " 0")?;
    }
    for &(coef, var) in &expr.terms {
        if coef < 0.0 {
            write!(w, " - {} x{var}", -coef)?;
        } else {
            write!(w, " + {coef} x{var}")?;
        }
    }
    Ok(())
}

/// Root-relaxation algorithm hint, mirroring the usual MILP solver knob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    /// Primal simplex.
    Primal,
    /// Dual simplex.
    Dual,
    /// Barrier.
    Barrier,
    /// Concurrent (default).
    #[default]
    Concurrent,
    /// Deterministic concurrent.
    Deterministic,
}

/// Solve configuration handed to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveConfig {
    /// Root algorithm hint.
    pub method: Method,
    /// Relative optimality gap at which the solver may stop.
    pub mip_gap: f64,
    /// Wall-clock limit; the best feasible solution so far is returned.
    pub time_limit: Option<Duration>,
    /// Thread count hint; `None` leaves it to the backend.
    pub threads: Option<usize>,
    /// Verbose solver output.
    pub verbose: bool,
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            method: Method::default(),
            mip_gap: 1e-4,
            time_limit: None,
            threads: None,
            verbose: false,
        }
    }
}

impl SolveConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the root algorithm hint.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the relative MIP gap.
    pub fn with_mip_gap(mut self, mip_gap: f64) -> Self {
        self.mip_gap = mip_gap;
        self
    }

    /// Set the wall-clock limit.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Set the thread count hint.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Toggle verbose output.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Termination report: did the backend prove optimality, or merely return
/// the best feasible assignment found within its limits?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// The returned assignment is optimal.
    Optimal,
    /// Best feasible assignment found before a limit was hit.
    Feasible,
}

/// A solved assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// One value per variable, indexed by [`VarId`].
    pub values: Vec<f64>,
    /// Objective value of the assignment.
    pub objective: f64,
    /// Termination report.
    pub status: SolveStatus,
}

/// Opaque MILP service: accepts a model and configuration, returns a value
/// per variable and a termination report.
pub trait IlpBackend {
    /// Solve the model.
    fn solve(&self, model: &IlpModel, config: &SolveConfig) -> Result<Solution>;
}

/// Exact enumeration backend for small models.
///
/// Single-variable equality constraints and `x_a == x_b` equalities are
/// propagated first (for the clustering formulation this collapses the
/// reflexivity, symmetry and hard constraints), then every assignment of
/// the remaining free variables is tried. Models with more free variables
/// than the cap are rejected rather than searched forever. The `method`,
/// `threads` and `mip_gap` knobs are accepted and ignored; the enumeration
/// is exact whenever it completes.
#[derive(Debug, Clone)]
pub struct ExhaustiveBackend {
    max_free_vars: usize,
}

impl Default for ExhaustiveBackend {
    fn default() -> Self {
        Self { max_free_vars: 24 }
    }
}

impl ExhaustiveBackend {
    /// Backend with the default free-variable cap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the free-variable cap. Values above 63 are clamped at solve
    /// time, since the enumeration mask is a `u64`.
    pub fn with_max_free_vars(mut self, max_free_vars: usize) -> Self {
        self.max_free_vars = max_free_vars;
        self
    }
}

const FEAS_TOL: f64 = 1e-6;

fn satisfied(c: &LinConstraint, values: &[f64]) -> bool {
    let lhs = c.expr.eval(values);
    match c.sense {
        Sense::Le => lhs <= c.rhs + FEAS_TOL,
        Sense::Ge => lhs >= c.rhs - FEAS_TOL,
        Sense::Eq => (lhs - c.rhs).abs() <= FEAS_TOL,
    }
}

impl IlpBackend for ExhaustiveBackend {
    fn solve(&self, model: &IlpModel, config: &SolveConfig) -> Result<Solution> {
        let n = model.n_vars();
        let (objective, direction) = model.objective();
        let direction = direction.unwrap_or(Direction::Maximize);

        // 1. propagate x_a == x_b equalities into classes
        let mut classes: UnionFind<usize> = UnionFind::new(n);
        for c in model.constraints() {
            if c.sense == Sense::Eq && c.rhs == 0.0 && c.expr.constant == 0.0 {
                if let [(ca, a), (cb, b)] = c.expr.terms[..] {
                    if ca == -cb && ca != 0.0 {
                        classes.union(a, b);
                    }
                }
            }
        }

        // 2. propagate single-variable fixings onto class representatives
        let mut fixed: HashMap<usize, f64> = HashMap::new();
        for c in model.constraints() {
            if c.sense == Sense::Eq {
                if let [(coef, var)] = c.expr.terms[..] {
                    if coef != 0.0 {
                        let value = (c.rhs - c.expr.constant) / coef;
                        let rep = classes.find(var);
                        match fixed.get(&rep) {
                            Some(&prev) if (prev - value).abs() > FEAS_TOL => {
                                return Err(Error::Infeasible);
                            }
                            _ => {
                                fixed.insert(rep, value);
                            }
                        }
                    }
                }
            }
        }

        // 3. enumerate the remaining free representatives
        let mut free: Vec<usize> = (0..n)
            .filter(|&v| classes.find(v) == v && !fixed.contains_key(&v))
            .collect();
        free.sort_unstable();
        // the u64 enumeration mask bounds the cap at 63 bits
        let cap = self.max_free_vars.min(63);
        if free.len() > cap {
            return Err(Error::TooLarge {
                vars: free.len(),
                max: cap,
            });
        }
        let free_index: HashMap<usize, usize> =
            free.iter().enumerate().map(|(i, &v)| (v, i)).collect();

        let assemble = |mask: u64| -> Vec<f64> {
            (0..n)
                .map(|v| {
                    let rep = classes.find(v);
                    match fixed.get(&rep) {
                        Some(&value) => value,
                        None => {
                            if (mask >> free_index[&rep]) & 1 == 1 {
                                1.0
                            } else {
                                0.0
                            }
                        }
                    }
                })
                .collect()
        };

        let better = |candidate: f64, incumbent: f64| match direction {
            Direction::Maximize => candidate > incumbent,
            Direction::Minimize => candidate < incumbent,
        };

        let mut best: Option<(Vec<f64>, f64)> = None;

        // warm start becomes the initial incumbent when feasible
        if let Some(start) = model.warm_start() {
            let mut values = assemble(0);
            for &(var, value) in start {
                if var < n {
                    values[var] = value;
                }
            }
            if model.constraints().iter().all(|c| satisfied(c, &values)) {
                let obj = objective.eval(&values);
                best = Some((values, obj));
            }
        }

        let started = Instant::now();
        let total: u64 = 1u64 << free.len();
        for mask in 0..total {
            if mask % 4096 == 0 {
                if let Some(limit) = config.time_limit {
                    if started.elapsed() > limit {
                        log::warn!("time limit hit after {mask}/{total} assignments");
                        return match best {
                            Some((values, obj)) => Ok(Solution {
                                values,
                                objective: obj,
                                status: SolveStatus::Feasible,
                            }),
                            None => Err(Error::TimeLimit),
                        };
                    }
                }
            }
            let values = assemble(mask);
            if !model.constraints().iter().all(|c| satisfied(c, &values)) {
                continue;
            }
            let obj = objective.eval(&values);
            let improved = match &best {
                None => true,
                Some((_, incumbent)) => better(obj, *incumbent),
            };
            if improved {
                if config.verbose {
                    log::debug!("incumbent improved to {obj}");
                }
                best = Some((values, obj));
            }
        }

        match best {
            Some((values, obj)) => Ok(Solution {
                values,
                objective: obj,
                status: SolveStatus::Optimal,
            }),
            None => Err(Error::Infeasible),
        }
    }
}
