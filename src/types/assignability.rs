//! The assignability relation `to <- from` and its substitution machinery.
//!
//! Assignability is what the checker uses to admit arguments, check results,
//! and select overloads. Type parameters bind through a [`Substitution`]: the
//! first type a parameter meets becomes its binding, and later occurrences of
//! the same parameter must agree. The relation commits bindings only on
//! success, so a failed overload leaves the substitution untouched.

use hashbrown::HashMap;

use crate::types::{Ty, TypeRegistry};

/// Bindings accumulated for type parameters during one resolution.
pub type Substitution<'t> = HashMap<&'t str, &'t Ty<'t>>;

/// Follow parameter bindings until a non-parameter type (or an unbound
/// parameter) is reached.
fn resolve<'t>(sub: &Substitution<'t>, ty: &'t Ty<'t>) -> &'t Ty<'t> {
    let mut current = ty;
    while let Ty::TypeParam(name) = current {
        match sub.get(name) {
            Some(&next) if !core::ptr::eq(next, current) => current = next,
            _ => break,
        }
    }
    current
}

/// Whether `param` occurs in `ty` after resolution. Binding a parameter to a
/// type containing itself would make resolution loop forever.
fn occurs_in<'t>(sub: &Substitution<'t>, param: &'t str, ty: &'t Ty<'t>) -> bool {
    match resolve(sub, ty) {
        &Ty::TypeParam(name) => name == param,
        &Ty::List(e) => occurs_in(sub, param, e),
        &Ty::Map(k, v) => occurs_in(sub, param, k) || occurs_in(sub, param, v),
        &Ty::Opaque { params, .. } => params.iter().any(|&p| occurs_in(sub, param, p)),
        &Ty::Function { result, args } => {
            occurs_in(sub, param, result) || args.iter().any(|&a| occurs_in(sub, param, a))
        }
        &Ty::Wrapper(p) => occurs_in(sub, param, p),
        &Ty::Type(Some(p)) => occurs_in(sub, param, p),
        _ => false,
    }
}

/// Check `to <- from`, committing parameter bindings to `sub` only when the
/// whole check succeeds.
pub fn is_assignable<'t>(sub: &mut Substitution<'t>, to: &'t Ty<'t>, from: &'t Ty<'t>) -> bool {
    let mut trial = sub.clone();
    if internal(&mut trial, to, from) {
        *sub = trial;
        true
    } else {
        false
    }
}

/// Componentwise [`is_assignable`] over two equal-length lists, with the same
/// all-or-nothing commit behavior.
pub fn is_assignable_all<'t>(
    sub: &mut Substitution<'t>,
    to: &[&'t Ty<'t>],
    from: &[&'t Ty<'t>],
) -> bool {
    if to.len() != from.len() {
        return false;
    }
    let mut trial = sub.clone();
    for (&t, &f) in to.iter().zip(from.iter()) {
        if !internal(&mut trial, t, f) {
            return false;
        }
    }
    *sub = trial;
    true
}

fn internal<'t>(sub: &mut Substitution<'t>, to: &'t Ty<'t>, from: &'t Ty<'t>) -> bool {
    let to = resolve(sub, to);
    let from = resolve(sub, from);

    if to == from {
        return true;
    }

    match (to, from) {
        // A parameter unifies with anything, binding all occurrences.
        (&Ty::TypeParam(name), _) => {
            if occurs_in(sub, name, from) {
                tracing::trace!(param = name, ty = %from, "occurs check rejected binding");
                return false;
            }
            sub.insert(name, from);
            true
        }
        (_, &Ty::TypeParam(name)) => {
            sub.insert(name, to);
            true
        }

        // The top type accepts and is accepted by everything.
        (&Ty::Dyn, _) | (_, &Ty::Dyn) => true,

        // Wrappers admit null and whatever their primitive admits.
        (&Ty::Wrapper(_), &Ty::Null) => true,
        (&Ty::Wrapper(p), _) => internal(sub, p, from),

        // Parameterized types: invariant componentwise.
        (&Ty::List(t), &Ty::List(f)) => internal(sub, t, f),
        (&Ty::Map(tk, tv), &Ty::Map(fk, fv)) => internal(sub, tk, fk) && internal(sub, tv, fv),
        (
            &Ty::Opaque {
                name: to_name,
                params: to_params,
            },
            &Ty::Opaque {
                name: from_name,
                params: from_params,
            },
        ) => {
            to_name == from_name
                && to_params.len() == from_params.len()
                && to_params
                    .iter()
                    .zip(from_params.iter())
                    .all(|(&t, &f)| internal(sub, t, f))
        }
        (
            &Ty::Function {
                result: to_result,
                args: to_args,
            },
            &Ty::Function {
                result: from_result,
                args: from_args,
            },
        ) => {
            to_args.len() == from_args.len()
                && internal(sub, to_result, from_result)
                && to_args
                    .iter()
                    .zip(from_args.iter())
                    .all(|(&t, &f)| internal(sub, t, f))
        }

        (&Ty::Type(Some(t)), &Ty::Type(Some(f))) => internal(sub, t, f),
        (&Ty::Type(None), &Ty::Type(_)) | (&Ty::Type(_), &Ty::Type(None)) => true,

        _ => false,
    }
}

/// Replace bound parameters in `ty` by their substitution, rebuilding
/// composites through `reg`. Unbound parameters stay in place.
pub fn substitute<'t>(
    reg: &'t TypeRegistry<'t>,
    sub: &Substitution<'t>,
    ty: &'t Ty<'t>,
) -> &'t Ty<'t> {
    match resolve(sub, ty) {
        &Ty::List(e) => reg.list(substitute(reg, sub, e)),
        &Ty::Map(k, v) => reg.map(substitute(reg, sub, k), substitute(reg, sub, v)),
        &Ty::Opaque { name, params } => {
            let params: Vec<&Ty> = params.iter().map(|&p| substitute(reg, sub, p)).collect();
            reg.opaque(name, &params)
        }
        &Ty::Function { result, args } => {
            let args: Vec<&Ty> = args.iter().map(|&a| substitute(reg, sub, a)).collect();
            reg.function(substitute(reg, sub, result), &args)
        }
        &Ty::Wrapper(p) => reg.wrapper(substitute(reg, sub, p)),
        &Ty::Type(Some(p)) => reg.type_of(Some(substitute(reg, sub, p))),
        resolved => resolved,
    }
}

/// Collect the names of all type parameters reachable in `ty`, in first-visit
/// order without duplicates.
pub fn type_params<'t>(ty: &'t Ty<'t>, out: &mut Vec<&'t str>) {
    match ty {
        &Ty::TypeParam(name) => {
            if !out.contains(&name) {
                out.push(name);
            }
        }
        &Ty::List(e) => type_params(e, out),
        &Ty::Map(k, v) => {
            type_params(k, out);
            type_params(v, out);
        }
        &Ty::Opaque { params, .. } => {
            for &p in params {
                type_params(p, out);
            }
        }
        &Ty::Function { result, args } => {
            for &a in args {
                type_params(a, out);
            }
            type_params(result, out);
        }
        &Ty::Wrapper(p) => type_params(p, out),
        &Ty::Type(Some(p)) => type_params(p, out),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use bumpalo::Bump;

    use super::*;

    #[test]
    fn reflexive_and_cross_kind() {
        let arena = Bump::new();
        let reg = TypeRegistry::new(&arena);
        let mut sub = Substitution::new();

        assert!(is_assignable(&mut sub, reg.int(), reg.int()));
        assert!(!is_assignable(&mut sub, reg.int(), reg.uint()));
        assert!(!is_assignable(&mut sub, reg.string(), reg.bytes()));
    }

    #[test]
    fn dyn_accepts_everything() {
        let arena = Bump::new();
        let reg = TypeRegistry::new(&arena);
        let mut sub = Substitution::new();

        assert!(is_assignable(&mut sub, reg.dyn_type(), reg.int()));
        assert!(is_assignable(&mut sub, reg.int(), reg.dyn_type()));
        assert!(is_assignable(
            &mut sub,
            reg.list(reg.dyn_type()),
            reg.list(reg.string())
        ));
    }

    #[test]
    fn wrapper_admits_null_and_primitive() {
        let arena = Bump::new();
        let reg = TypeRegistry::new(&arena);
        let mut sub = Substitution::new();

        let w = reg.wrapper(reg.int());
        assert!(is_assignable(&mut sub, w, reg.null()));
        assert!(is_assignable(&mut sub, w, reg.int()));
        assert!(!is_assignable(&mut sub, w, reg.string()));
        assert!(!is_assignable(&mut sub, reg.int(), reg.null()));
    }

    #[test]
    fn containers_are_invariant() {
        let arena = Bump::new();
        let reg = TypeRegistry::new(&arena);
        let mut sub = Substitution::new();

        assert!(is_assignable(
            &mut sub,
            reg.map(reg.string(), reg.int()),
            reg.map(reg.string(), reg.int())
        ));
        assert!(!is_assignable(
            &mut sub,
            reg.map(reg.string(), reg.int()),
            reg.map(reg.string(), reg.uint())
        ));
    }

    #[test]
    fn params_bind_consistently() {
        let arena = Bump::new();
        let reg = TypeRegistry::new(&arena);
        let t = reg.type_param("T");

        // (T, T) <- (int, int) binds T to int.
        let mut sub = Substitution::new();
        assert!(is_assignable_all(&mut sub, &[t, t], &[reg.int(), reg.int()]));
        assert!(core::ptr::eq(substitute(reg, &sub, t), reg.int()));

        // (T, T) <- (int, string) must fail and leave no binding behind.
        let mut sub = Substitution::new();
        assert!(!is_assignable_all(
            &mut sub,
            &[t, t],
            &[reg.int(), reg.string()]
        ));
        assert!(sub.is_empty());
    }

    #[test]
    fn param_binds_through_containers() {
        let arena = Bump::new();
        let reg = TypeRegistry::new(&arena);
        let t = reg.type_param("T");
        let mut sub = Substitution::new();

        assert!(is_assignable(&mut sub, reg.list(t), reg.list(reg.string())));
        assert!(core::ptr::eq(substitute(reg, &sub, t), reg.string()));
    }

    #[test]
    fn occurs_check_rejects_infinite_binding() {
        let arena = Bump::new();
        let reg = TypeRegistry::new(&arena);
        let t = reg.type_param("T");
        let mut sub = Substitution::new();

        assert!(!is_assignable(&mut sub, t, reg.list(t)));
    }

    #[test]
    fn param_extraction_walks_signatures() {
        let arena = Bump::new();
        let reg = TypeRegistry::new(&arena);
        let t = reg.type_param("T");
        let u = reg.type_param("U");
        let f = reg.function(u, &[reg.list(t), t]);

        let mut params = Vec::new();
        type_params(f, &mut params);
        assert_eq!(params, vec!["T", "U"]);
    }
}
