use std::fmt::{Debug, Display, Formatter};

use crate::quantity::Quantity;

/// Dollars per megawatt-hour.
pub type MegawattHourPrice = Quantity<-1, -1, 1>;

impl Display for MegawattHourPrice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "${:.0}/MWh", self.0)
    }
}

impl Debug for MegawattHourPrice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}$/MWh", self.0)
    }
}
