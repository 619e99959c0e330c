//! Invocation adapter
//!
//! Turns a JSON argument array into a typed call of a host function and the
//! function's return value back into JSON.
//!
//! The function's shape is read once, when it is bound:
//!
//! - every parameter implements [`Param`]: any `DeserializeOwned` type
//!   decodes one argument, and [`Variadic<T>`] in last position absorbs the
//!   remaining arguments;
//! - the return type implements [`IntoReturn`], which fixes a
//!   [`ReturnShape`].
//!
//! ```ignore
//! let sum = Adapter::new(|label: String, nums: Variadic<i64>| -> Result<i64, String> {
//!     Ok(nums.iter().sum())
//! })?;
//! assert_eq!(sum.invoke(r#"["x", 1, 2, 3]"#)?, json!(6));
//! ```

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Display};
use std::hash::Hash;
use std::ops::Deref;
use std::panic::{self, AssertUnwindSafe};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::engine::Completion;
use crate::error::{BindResult, BridgeError};

// ============================================================================
// Signature
// ============================================================================

/// What a bound function returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    /// Nothing; completes with `null`
    None,
    /// A single value
    Value,
    /// Only an error, `null` on success
    Error,
    /// A value, or an error that replaces it
    ValueAndError,
}

/// Shape of a bound function, derived at bind time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    /// Number of declared parameters, the variadic one included
    pub params: usize,
    /// Last parameter absorbs zero or more trailing arguments
    pub variadic: bool,
    /// Return shape
    pub returns: ReturnShape,
}

impl Signature {
    /// Build a signature from per-parameter variadic flags
    pub fn from_params(variadic: &[bool], returns: ReturnShape) -> BindResult<Self> {
        if let Some((_, fixed)) = variadic.split_last() {
            if fixed.iter().any(|v| *v) {
                return Err(BridgeError::configuration(
                    "only the last parameter may be variadic",
                ));
            }
        }
        Ok(Signature {
            params: variadic.len(),
            variadic: variadic.last().copied().unwrap_or(false),
            returns,
        })
    }

    /// Minimum number of arguments
    pub fn required(&self) -> usize {
        if self.variadic {
            self.params - 1
        } else {
            self.params
        }
    }

    /// Check an argument count against this signature
    pub fn check_arity(&self, got: usize) -> BindResult<()> {
        let ok = if self.variadic {
            got >= self.required()
        } else {
            got == self.params
        };
        if ok {
            Ok(())
        } else {
            Err(BridgeError::Arity {
                expected: self.required(),
                variadic: self.variadic,
                got,
            })
        }
    }
}

// ============================================================================
// Parameters
// ============================================================================

/// A parameter of a bound function.
///
/// `decode` receives the slice of arguments assigned to this parameter: one
/// element for a fixed parameter, the whole tail for a variadic one.
/// `index` is the position of the first element in the request.
pub trait Param: Sized {
    /// Absorbs all remaining arguments
    const VARIADIC: bool = false;

    /// Decode the assigned arguments
    fn decode(args: &[Value], index: usize) -> BindResult<Self>;
}

impl<T: DeserializeOwned> Param for T {
    fn decode(args: &[Value], index: usize) -> BindResult<Self> {
        T::deserialize(&args[0]).map_err(|source| BridgeError::Argument { index, source })
    }
}

/// Trailing parameter receiving zero or more arguments of type `T`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Variadic<T>(pub Vec<T>);

impl<T> Variadic<T> {
    /// Take the collected arguments
    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

impl<T> Deref for Variadic<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0
    }
}

impl<T> IntoIterator for Variadic<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<T: DeserializeOwned> Param for Variadic<T> {
    const VARIADIC: bool = true;

    fn decode(args: &[Value], index: usize) -> BindResult<Self> {
        args.iter()
            .enumerate()
            .map(|(offset, arg)| {
                T::deserialize(arg).map_err(|source| BridgeError::Argument {
                    index: index + offset,
                    source,
                })
            })
            .collect::<BindResult<Vec<T>>>()
            .map(Variadic)
    }
}

// ============================================================================
// Return values
// ============================================================================

fn encode<T: Serialize + ?Sized>(value: &T) -> BindResult<Value> {
    serde_json::to_value(value).map_err(BridgeError::Encoding)
}

/// Return type of a bound function.
///
/// Implemented for `()`, serializable values, `Result<T, E>`, `(value,
/// ErrorSlot)` pairs, and tuples of three to eight elements. Pairs whose
/// second element is not an error and the wider tuples are refused at bind
/// time with [`BridgeError::Configuration`]. A return type with no impl,
/// such as a bare struct or a nine-tuple, does not compile as a binding;
/// wrap structs in [`Json`].
pub trait IntoReturn {
    /// Shape of this return type, or why it cannot be bound
    fn shape() -> BindResult<ReturnShape>;

    /// Package the returned value
    fn into_result(self) -> BindResult<Value>;
}

impl IntoReturn for () {
    fn shape() -> BindResult<ReturnShape> {
        Ok(ReturnShape::None)
    }

    fn into_result(self) -> BindResult<Value> {
        Ok(Value::Null)
    }
}

macro_rules! value_returns {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoReturn for $ty {
                fn shape() -> BindResult<ReturnShape> {
                    Ok(ReturnShape::Value)
                }

                fn into_result(self) -> BindResult<Value> {
                    encode(&self)
                }
            }
        )*
    };
}

value_returns!(
    bool, char, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, String,
    &'static str, Value,
);

impl<T: Serialize> IntoReturn for Vec<T> {
    fn shape() -> BindResult<ReturnShape> {
        Ok(ReturnShape::Value)
    }

    fn into_result(self) -> BindResult<Value> {
        encode(&self)
    }
}

impl<T: Serialize> IntoReturn for Option<T> {
    fn shape() -> BindResult<ReturnShape> {
        Ok(ReturnShape::Value)
    }

    fn into_result(self) -> BindResult<Value> {
        encode(&self)
    }
}

impl<K: Serialize + Eq + Hash, V: Serialize> IntoReturn for HashMap<K, V> {
    fn shape() -> BindResult<ReturnShape> {
        Ok(ReturnShape::Value)
    }

    fn into_result(self) -> BindResult<Value> {
        encode(&self)
    }
}

impl<K: Serialize + Ord, V: Serialize> IntoReturn for BTreeMap<K, V> {
    fn shape() -> BindResult<ReturnShape> {
        Ok(ReturnShape::Value)
    }

    fn into_result(self) -> BindResult<Value> {
        encode(&self)
    }
}

/// Return any `Serialize` type as a single value
#[derive(Debug, Clone, PartialEq)]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoReturn for Json<T> {
    fn shape() -> BindResult<ReturnShape> {
        Ok(ReturnShape::Value)
    }

    fn into_result(self) -> BindResult<Value> {
        encode(&self.0)
    }
}

impl<T: Serialize + 'static, E: Display> IntoReturn for Result<T, E> {
    fn shape() -> BindResult<ReturnShape> {
        if TypeId::of::<T>() == TypeId::of::<()>() {
            Ok(ReturnShape::Error)
        } else {
            Ok(ReturnShape::ValueAndError)
        }
    }

    fn into_result(self) -> BindResult<Value> {
        match self {
            Ok(value) => encode(&value),
            Err(e) => Err(BridgeError::Application(e.to_string())),
        }
    }
}

/// Second element of a `(value, error)` return pair.
///
/// `Option<E: Display>` carries the error. The primitives, `String`,
/// `Value`, `Vec<T>`, the maps and [`Json<T>`] are accepted as a second
/// element so the pair fails at bind time instead of at compile time.
/// Any other second element does not compile.
pub trait ErrorSlot {
    /// Whether this type can carry an error
    const IS_ERROR: bool;

    /// Error message, if one is present
    fn into_message(self) -> Option<String>;
}

impl<E: Display> ErrorSlot for Option<E> {
    const IS_ERROR: bool = true;

    fn into_message(self) -> Option<String> {
        self.map(|e| e.to_string())
    }
}

macro_rules! non_error_slots {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ErrorSlot for $ty {
                const IS_ERROR: bool = false;

                fn into_message(self) -> Option<String> {
                    None
                }
            }
        )*
    };
}

non_error_slots!(
    bool, char, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, String,
    &'static str, Value,
);

impl<T> ErrorSlot for Vec<T> {
    const IS_ERROR: bool = false;

    fn into_message(self) -> Option<String> {
        None
    }
}

impl<K, V> ErrorSlot for HashMap<K, V> {
    const IS_ERROR: bool = false;

    fn into_message(self) -> Option<String> {
        None
    }
}

impl<K, V> ErrorSlot for BTreeMap<K, V> {
    const IS_ERROR: bool = false;

    fn into_message(self) -> Option<String> {
        None
    }
}

impl<T> ErrorSlot for Json<T> {
    const IS_ERROR: bool = false;

    fn into_message(self) -> Option<String> {
        None
    }
}

impl<A: Serialize, B: ErrorSlot> IntoReturn for (A, B) {
    fn shape() -> BindResult<ReturnShape> {
        if B::IS_ERROR {
            Ok(ReturnShape::ValueAndError)
        } else {
            Err(BridgeError::configuration(
                "second return value must be an error",
            ))
        }
    }

    fn into_result(self) -> BindResult<Value> {
        match self.1.into_message() {
            Some(message) => Err(BridgeError::Application(message)),
            None => encode(&self.0),
        }
    }
}

const TOO_MANY_RETURNS: &str = "function may only return a value or a value+error";

macro_rules! rejected_returns {
    ($(($($ty:ident),+)),* $(,)?) => {
        $(
            impl<$($ty),+> IntoReturn for ($($ty),+) {
                fn shape() -> BindResult<ReturnShape> {
                    Err(BridgeError::configuration(TOO_MANY_RETURNS))
                }

                fn into_result(self) -> BindResult<Value> {
                    Err(BridgeError::configuration(TOO_MANY_RETURNS))
                }
            }
        )*
    };
}

rejected_returns!(
    (A, B, C),
    (A, B, C, D),
    (A, B, C, D, E),
    (A, B, C, D, E, F),
    (A, B, C, D, E, F, G),
    (A, B, C, D, E, F, G, H),
);

// ============================================================================
// Bindable functions
// ============================================================================

/// A host function that can be bound to a script name.
///
/// Implemented for `Fn` closures and functions of up to eight [`Param`]
/// parameters returning an [`IntoReturn`] type. `Args` is the parameter
/// tuple and only serves to keep the implementations apart.
pub trait IntoBinding<Args>: Send + Sync + 'static {
    /// Shape of the function
    fn signature() -> BindResult<Signature>;

    /// Decode `args`, call the function and package its result.
    ///
    /// `args` must already satisfy [`Signature::check_arity`].
    fn call(&self, args: &[Value]) -> BindResult<Value>;
}

macro_rules! impl_into_binding {
    ($($ty:ident $val:ident),*) => {
        impl<F, R, $($ty,)*> IntoBinding<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> R + Send + Sync + 'static,
            R: IntoReturn,
            $($ty: Param,)*
        {
            fn signature() -> BindResult<Signature> {
                let variadic: &[bool] = &[$(<$ty as Param>::VARIADIC),*];
                Signature::from_params(variadic, R::shape()?)
            }

            #[allow(unused_variables, unused_mut, unused_assignments)]
            fn call(&self, args: &[Value]) -> BindResult<Value> {
                let mut index = 0;
                $(
                    let $val = if <$ty as Param>::VARIADIC {
                        let v = <$ty as Param>::decode(&args[index..], index)?;
                        index = args.len();
                        v
                    } else {
                        let v = <$ty as Param>::decode(&args[index..index + 1], index)?;
                        index += 1;
                        v
                    };
                )*
                (self)($($val),*).into_result()
            }
        }
    };
}

impl_into_binding!();
impl_into_binding!(A1 a1);
impl_into_binding!(A1 a1, A2 a2);
impl_into_binding!(A1 a1, A2 a2, A3 a3);
impl_into_binding!(A1 a1, A2 a2, A3 a3, A4 a4);
impl_into_binding!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);
impl_into_binding!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);
impl_into_binding!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7);
impl_into_binding!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8);

// ============================================================================
// Adapter
// ============================================================================

type ErasedCall = Box<dyn Fn(&[Value]) -> BindResult<Value> + Send + Sync>;

/// A bound function with its validated signature
pub struct Adapter {
    signature: Signature,
    call: ErasedCall,
}

impl Adapter {
    /// Validate `f`'s shape and wrap it.
    ///
    /// Fails with [`BridgeError::Configuration`] if the shape cannot be
    /// served; nothing is registered in that case.
    pub fn new<F, Args>(f: F) -> BindResult<Self>
    where
        F: IntoBinding<Args>,
        Args: 'static,
    {
        let signature = F::signature()?;
        let call: ErasedCall =
            Box::new(move |args: &[Value]| <F as IntoBinding<Args>>::call(&f, args));
        Ok(Adapter { signature, call })
    }

    /// Signature read at bind time
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Serve one request: parse, check arity, decode, call, encode.
    ///
    /// A panic in the bound function is caught and reported as
    /// [`BridgeError::Panicked`].
    pub fn invoke(&self, request: &str) -> BindResult<Value> {
        let args: Vec<Value> = serde_json::from_str(request).map_err(BridgeError::Request)?;
        self.signature.check_arity(args.len())?;

        match panic::catch_unwind(AssertUnwindSafe(|| (self.call)(&args))) {
            Ok(result) => result,
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                tracing::warn!(panic = %msg, "bound function panicked");
                Err(BridgeError::Panicked(msg))
            }
        }
    }

    /// Serve one request and fold the result into a [`Completion`]
    pub fn complete(&self, request: &str) -> Completion {
        let result = self.invoke(request);
        if let Err(e) = &result {
            tracing::debug!(error = %e, "binding call failed");
        }
        Completion::from_result(result)
    }
}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
