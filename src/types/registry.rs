use core::cell::{Cell, RefCell};

use bumpalo::Bump;
use hashbrown::HashMap;

use crate::types::Ty;

/// Arena-backed interner for types.
///
/// Every `&'t Ty<'t>` handed out by a registry lives in its arena and is
/// interned, so structural equality within one registry is pointer equality.
/// The registry is also the only way to build composite types, which keeps
/// the child references inside the same arena.
pub struct TypeRegistry<'t> {
    arena: &'t Bump,
    interned: RefCell<HashMap<Ty<'t>, &'t Ty<'t>>>,
    interned_strs: RefCell<HashMap<&'t str, &'t str>>,
    next_param: Cell<u32>,
}

impl<'t> TypeRegistry<'t> {
    pub fn new(arena: &'t Bump) -> &'t Self {
        arena.alloc(Self {
            arena,
            interned: RefCell::new(HashMap::new()),
            interned_strs: RefCell::new(HashMap::new()),
            next_param: Cell::new(0),
        })
    }

    pub fn intern_str(&self, s: &str) -> &'t str {
        if let Some(&interned) = self.interned_strs.borrow().get(s) {
            return interned;
        }
        let arena_str: &'t str = self.arena.alloc_str(s);
        self.interned_strs.borrow_mut().insert(arena_str, arena_str);
        arena_str
    }

    fn intern(&self, ty: Ty<'t>) -> &'t Ty<'t> {
        if let Some(&interned) = self.interned.borrow().get(&ty) {
            return interned;
        }
        let arena_ty: &'t Ty<'t> = self.arena.alloc(ty.clone());
        self.interned.borrow_mut().insert(ty, arena_ty);
        arena_ty
    }

    // Primitive factories.
    pub fn null(&self) -> &'t Ty<'t> {
        self.intern(Ty::Null)
    }
    pub fn bool(&self) -> &'t Ty<'t> {
        self.intern(Ty::Bool)
    }
    pub fn int(&self) -> &'t Ty<'t> {
        self.intern(Ty::Int)
    }
    pub fn uint(&self) -> &'t Ty<'t> {
        self.intern(Ty::Uint)
    }
    pub fn double(&self) -> &'t Ty<'t> {
        self.intern(Ty::Double)
    }
    pub fn string(&self) -> &'t Ty<'t> {
        self.intern(Ty::String)
    }
    pub fn bytes(&self) -> &'t Ty<'t> {
        self.intern(Ty::Bytes)
    }
    pub fn duration(&self) -> &'t Ty<'t> {
        self.intern(Ty::Duration)
    }
    pub fn timestamp(&self) -> &'t Ty<'t> {
        self.intern(Ty::Timestamp)
    }
    pub fn dyn_type(&self) -> &'t Ty<'t> {
        self.intern(Ty::Dyn)
    }

    pub fn list(&self, elem: &'t Ty<'t>) -> &'t Ty<'t> {
        self.intern(Ty::List(elem))
    }

    pub fn map(&self, key: &'t Ty<'t>, value: &'t Ty<'t>) -> &'t Ty<'t> {
        self.intern(Ty::Map(key, value))
    }

    pub fn opaque(&self, name: &str, params: &[&'t Ty<'t>]) -> &'t Ty<'t> {
        let name = self.intern_str(name);
        let params: &'t [&'t Ty<'t>] = self.arena.alloc_slice_copy(params);
        self.intern(Ty::Opaque { name, params })
    }

    pub fn function(&self, result: &'t Ty<'t>, args: &[&'t Ty<'t>]) -> &'t Ty<'t> {
        let args: &'t [&'t Ty<'t>] = self.arena.alloc_slice_copy(args);
        self.intern(Ty::Function { result, args })
    }

    pub fn type_param(&self, name: &str) -> &'t Ty<'t> {
        let name = self.intern_str(name);
        self.intern(Ty::TypeParam(name))
    }

    pub fn struct_type(&self, name: &str) -> &'t Ty<'t> {
        let name = self.intern_str(name);
        self.intern(Ty::Struct(name))
    }

    pub fn wrapper(&self, primitive: &'t Ty<'t>) -> &'t Ty<'t> {
        debug_assert!(
            matches!(
                primitive,
                Ty::Bool | Ty::Int | Ty::Uint | Ty::Double | Ty::String | Ty::Bytes
            ),
            "wrapper over non-primitive {}",
            primitive
        );
        self.intern(Ty::Wrapper(primitive))
    }

    pub fn type_of(&self, ty: Option<&'t Ty<'t>>) -> &'t Ty<'t> {
        self.intern(Ty::Type(ty))
    }

    /// The checker-facing type of optional list and map entries.
    pub fn optional(&self, inner: &'t Ty<'t>) -> &'t Ty<'t> {
        self.opaque("optional_type", &[inner])
    }

    /// A type parameter with a name no declaration can use, for overload
    /// instantiation.
    pub fn fresh_param(&self) -> &'t Ty<'t> {
        let n = self.next_param.get();
        self.next_param
            .set(n.checked_add(1).expect("type parameter id overflowed"));
        self.type_param(&format!("%{}", n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_returns_same_pointer() {
        let arena = Bump::new();
        let reg = TypeRegistry::new(&arena);

        assert!(core::ptr::eq(reg.int(), reg.int()));
        assert!(core::ptr::eq(
            reg.list(reg.string()),
            reg.list(reg.string())
        ));
        assert!(core::ptr::eq(
            reg.map(reg.string(), reg.int()),
            reg.map(reg.string(), reg.int())
        ));
        assert!(!core::ptr::eq(reg.int(), reg.uint()));
    }

    #[test]
    fn fresh_params_are_distinct() {
        let arena = Bump::new();
        let reg = TypeRegistry::new(&arena);

        let a = reg.fresh_param();
        let b = reg.fresh_param();
        assert!(!core::ptr::eq(a, b));
    }

    #[test]
    fn opaque_params_intern_structurally() {
        let arena = Bump::new();
        let reg = TypeRegistry::new(&arena);

        let a = reg.optional(reg.int());
        let b = reg.optional(reg.int());
        assert!(core::ptr::eq(a, b));
        assert_eq!(a.to_string(), "optional_type(int)");
    }
}
