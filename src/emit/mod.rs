//! Drawable emitters: one module per directive family, each a pure function
//! from parsed parameters to the byte sequence for that directive. Keeping
//! these pure (no I/O) is what lets the interpreter build a directive's full
//! buffer before ever touching the printer port, satisfying the
//! all-or-nothing-per-directive emission rule.

pub mod barcode;
pub mod bitmap;
pub mod control;
pub mod shapes;
pub mod text;
