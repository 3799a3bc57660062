//! Composable message predicates applied at subscribe time.
//!
//! A filter is a pure, non-blocking predicate over a message. Concrete
//! predicates inspect a single field through a caller-supplied selector; the
//! bus never looks inside messages itself. `and`/`or`/`not` compose filters
//! into a boolean lattice.

use std::collections::HashSet;
use std::hash::Hash;
use std::marker::PhantomData;
use std::mem::{self, Discriminant};

pub trait PubSubFilter<M>: Send + Sync {
    fn accept(&self, message: &M) -> bool;

    fn and<F>(self, other: F) -> And<Self, F>
    where
        Self: Sized,
        F: PubSubFilter<M>,
    {
        And { left: self, right: other }
    }

    fn or<F>(self, other: F) -> Or<Self, F>
    where
        Self: Sized,
        F: PubSubFilter<M>,
    {
        Or { left: self, right: other }
    }

    fn not(self) -> Not<Self>
    where
        Self: Sized,
    {
        Not { inner: self }
    }

    fn boxed(self) -> BoxFilter<M>
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }
}

pub type BoxFilter<M> = Box<dyn PubSubFilter<M>>;

impl<M> PubSubFilter<M> for BoxFilter<M> {
    fn accept(&self, message: &M) -> bool {
        (**self).accept(message)
    }
}

pub struct And<L, R> {
    left: L,
    right: R,
}

impl<M, L, R> PubSubFilter<M> for And<L, R>
where
    L: PubSubFilter<M>,
    R: PubSubFilter<M>,
{
    fn accept(&self, message: &M) -> bool {
        self.left.accept(message) && self.right.accept(message)
    }
}

pub struct Or<L, R> {
    left: L,
    right: R,
}

impl<M, L, R> PubSubFilter<M> for Or<L, R>
where
    L: PubSubFilter<M>,
    R: PubSubFilter<M>,
{
    fn accept(&self, message: &M) -> bool {
        self.left.accept(message) || self.right.accept(message)
    }
}

pub struct Not<F> {
    inner: F,
}

impl<M, F> PubSubFilter<M> for Not<F>
where
    F: PubSubFilter<M>,
{
    fn accept(&self, message: &M) -> bool {
        !self.inner.accept(message)
    }
}

/// Accepts messages whose selected field equals an expected value.
pub struct FieldEquals<F, V> {
    selector: F,
    value: V,
}

impl<F, V> FieldEquals<F, V> {
    pub fn new(selector: F, value: V) -> Self {
        Self { selector, value }
    }
}

impl<M, F, V> PubSubFilter<M> for FieldEquals<F, V>
where
    F: for<'a> Fn(&'a M) -> &'a V + Send + Sync,
    V: PartialEq + Send + Sync,
{
    fn accept(&self, message: &M) -> bool {
        (self.selector)(message) == &self.value
    }
}

/// Accepts messages whose selected field contains a value: a substring for
/// strings, an element for collections (see [`Contains`]).
pub struct FieldContains<F, C, V> {
    selector: F,
    value: V,
    _container: PhantomData<fn() -> C>,
}

impl<F, C, V> FieldContains<F, C, V> {
    pub fn new(selector: F, value: V) -> Self {
        Self {
            selector,
            value,
            _container: PhantomData,
        }
    }
}

impl<M, F, C, V> PubSubFilter<M> for FieldContains<F, C, V>
where
    F: for<'a> Fn(&'a M) -> &'a C + Send + Sync,
    C: Contains<V>,
    V: Send + Sync,
{
    fn accept(&self, message: &M) -> bool {
        (self.selector)(message).contains_value(&self.value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LengthMode {
    Eq,
    Min,
    Max,
}

/// Accepts messages based on the length of the selected field.
pub struct FieldLength<F, C> {
    selector: F,
    length: usize,
    mode: LengthMode,
    _container: PhantomData<fn() -> C>,
}

impl<F, C> FieldLength<F, C> {
    pub fn new(selector: F, length: usize, mode: LengthMode) -> Self {
        Self {
            selector,
            length,
            mode,
            _container: PhantomData,
        }
    }
}

impl<M, F, C> PubSubFilter<M> for FieldLength<F, C>
where
    F: for<'a> Fn(&'a M) -> &'a C + Send + Sync,
    C: Len,
{
    fn accept(&self, message: &M) -> bool {
        let length = (self.selector)(message).length();
        match self.mode {
            LengthMode::Eq => length == self.length,
            LengthMode::Min => length >= self.length,
            LengthMode::Max => length <= self.length,
        }
    }
}

/// Accepts messages of one concrete enum variant.
pub struct TypeIs<M> {
    variant: Discriminant<M>,
}

impl<M> TypeIs<M> {
    /// Builds the filter from a sample value of the wanted variant.
    pub fn of(sample: &M) -> Self {
        Self {
            variant: mem::discriminant(sample),
        }
    }
}

impl<M> PubSubFilter<M> for TypeIs<M> {
    fn accept(&self, message: &M) -> bool {
        mem::discriminant(message) == self.variant
    }
}

/// Membership test used by [`FieldContains`].
pub trait Contains<V> {
    fn contains_value(&self, value: &V) -> bool;
}

impl Contains<String> for String {
    fn contains_value(&self, value: &String) -> bool {
        self.contains(value.as_str())
    }
}

impl<'v> Contains<&'v str> for String {
    fn contains_value(&self, value: &&'v str) -> bool {
        self.contains(*value)
    }
}

impl Contains<char> for String {
    fn contains_value(&self, value: &char) -> bool {
        self.contains(*value)
    }
}

impl<T: PartialEq> Contains<T> for Vec<T> {
    fn contains_value(&self, value: &T) -> bool {
        self.iter().any(|item| item == value)
    }
}

impl<T: Eq + Hash> Contains<T> for HashSet<T> {
    fn contains_value(&self, value: &T) -> bool {
        self.contains(value)
    }
}

/// Length measurement used by [`FieldLength`].
pub trait Len {
    fn length(&self) -> usize;
}

impl Len for String {
    fn length(&self) -> usize {
        self.len()
    }
}

impl<T> Len for Vec<T> {
    fn length(&self) -> usize {
        self.len()
    }
}

impl<T> Len for HashSet<T> {
    fn length(&self) -> usize {
        self.len()
    }
}
