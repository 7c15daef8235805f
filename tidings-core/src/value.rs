//! Type-erased field values and the typed keys that name them.

use std::{
    any::{Any, TypeId},
    fmt,
    marker::PhantomData,
};

/// A type-erased field value as passed through a dispatch.
pub type FieldValue = Box<dyn Any + Send + Sync>;

/// Identity and display name of a Rust type.
#[derive(Clone, Copy)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
}

impl TypeInfo {
    /// Describe `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The type's `TypeId`.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The type's name as reported by `std::any::type_name`.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl std::hash::Hash for TypeInfo {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// The declared type of an event field.
///
/// Carries a clone function so an event instance can be built from the raw
/// call arguments while the arguments themselves stay available to
/// fast-invoke listeners.
#[derive(Clone, Copy)]
pub struct FieldType {
    info: TypeInfo,
    clone_fn: fn(&(dyn Any + Send + Sync)) -> Option<FieldValue>,
}

impl FieldType {
    /// Describe a field holding `T`.
    pub fn of<T: Clone + Send + Sync + 'static>() -> Self {
        Self {
            info: TypeInfo::of::<T>(),
            clone_fn: clone_value::<T>,
        }
    }

    /// The underlying type.
    pub fn info(&self) -> TypeInfo {
        self.info
    }

    /// The type's `TypeId`.
    pub fn id(&self) -> TypeId {
        self.info.id()
    }

    /// The type's name.
    pub fn name(&self) -> &'static str {
        self.info.name()
    }

    /// Clone an erased value of this type. `None` if `value` is another type.
    pub fn clone_value(&self, value: &(dyn Any + Send + Sync)) -> Option<FieldValue> {
        (self.clone_fn)(value)
    }
}

impl PartialEq for FieldType {
    fn eq(&self, other: &Self) -> bool {
        self.info == other.info
    }
}

impl Eq for FieldType {}

impl fmt::Debug for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.info, f)
    }
}

fn clone_value<T: Clone + Send + Sync + 'static>(
    value: &(dyn Any + Send + Sync),
) -> Option<FieldValue> {
    value
        .downcast_ref::<T>()
        .map(|v| Box::new(v.clone()) as FieldValue)
}

/// A typed handle naming one event field.
///
/// Event contracts declare their accessors with keys, and event instances are
/// read and written through the same keys.
///
/// ```rust,ignore
/// pub const SCORE: FieldKey<i32> = FieldKey::new("score");
/// ```
pub struct FieldKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FieldKey<T> {
    /// Create a key for the field called `name`.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// The field name.
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for FieldKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FieldKey<T> {}

impl<T> fmt::Debug for FieldKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldKey").field(&self.name).finish()
    }
}

/// A tuple of owned values passed positionally to a callable.
///
/// Implemented for tuples of up to eight elements.
pub trait ArgTuple: Send + 'static {
    /// The element types, in order.
    fn types() -> Vec<TypeInfo>;

    /// Erase the elements, in order.
    fn into_values(self) -> Vec<FieldValue>;
}

macro_rules! impl_arg_tuple {
    ($($ty:ident),*) => {
        impl<$($ty,)*> ArgTuple for ($($ty,)*)
        where
            $($ty: Send + Sync + 'static,)*
        {
            fn types() -> Vec<TypeInfo> {
                vec![$(TypeInfo::of::<$ty>()),*]
            }

            #[allow(non_snake_case)]
            fn into_values(self) -> Vec<FieldValue> {
                let ($($ty,)*) = self;
                vec![$(Box::new($ty) as FieldValue),*]
            }
        }
    };
}

impl_arg_tuple!();
impl_arg_tuple!(A);
impl_arg_tuple!(A, B);
impl_arg_tuple!(A, B, C);
impl_arg_tuple!(A, B, C, D);
impl_arg_tuple!(A, B, C, D, E);
impl_arg_tuple!(A, B, C, D, E, F);
impl_arg_tuple!(A, B, C, D, E, F, G);
impl_arg_tuple!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_value_checks_type() {
        let ty = FieldType::of::<String>();
        let value: FieldValue = Box::new(String::from("a"));
        let cloned = ty.clone_value(&*value).unwrap();
        assert_eq!(cloned.downcast_ref::<String>().unwrap(), "a");

        let other: FieldValue = Box::new(3_i32);
        assert!(ty.clone_value(&*other).is_none());
    }

    #[test]
    fn arg_tuple_preserves_order() {
        assert_eq!(
            <(String, i32)>::types(),
            vec![TypeInfo::of::<String>(), TypeInfo::of::<i32>()]
        );
        let values = (String::from("x"), 7_i32).into_values();
        assert_eq!(values[0].downcast_ref::<String>().unwrap(), "x");
        assert_eq!(*values[1].downcast_ref::<i32>().unwrap(), 7);
        assert!(<()>::types().is_empty());
    }
}
