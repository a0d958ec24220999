/// Implements arithmetic operator traits for single-field newtypes by delegating to the named method on the inner
/// value, e.g. `op!(binary Points, Add, add, saturating_add)`.
#[macro_export]
macro_rules! op {
    (binary $for_struct:ident, $impl_trait:ident, $impl_fn:ident, $inner_fn:ident) => {
        impl $impl_trait for $for_struct {
            type Output = Self;

            fn $impl_fn(self, rhs: Self) -> Self::Output {
                Self(self.0.$inner_fn(rhs.0))
            }
        }
    };

    (inplace $for_struct:ident, $impl_trait:ident, $impl_fn:ident, $inner_fn:ident) => {
        impl $impl_trait for $for_struct {
            fn $impl_fn(&mut self, rhs: Self) {
                self.0 = self.0.$inner_fn(rhs.0);
            }
        }
    };

    (unary $for_struct:ident, $impl_trait:ident, $impl_fn:ident, $inner_fn:ident) => {
        impl $impl_trait for $for_struct {
            type Output = Self;

            fn $impl_fn(self) -> Self::Output {
                Self(self.0.$inner_fn())
            }
        }
    };
}
