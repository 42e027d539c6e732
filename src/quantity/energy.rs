use std::{
    fmt::{Debug, Display, Formatter},
    ops::Div,
};

use crate::quantity::{Quantity, power::Megawatts, time::Hours};

pub type MegawattHours = Quantity<1, 1, 0>;

impl Display for MegawattHours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0} MWh", self.0)
    }
}

impl Debug for MegawattHours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}MWh", self.0)
    }
}

impl Div<Hours> for MegawattHours {
    type Output = Megawatts;

    fn div(self, rhs: Hours) -> Self::Output {
        Quantity(self.0 / rhs.0)
    }
}

impl Div<Megawatts> for MegawattHours {
    type Output = Hours;

    fn div(self, rhs: Megawatts) -> Self::Output {
        Quantity(self.0 / rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_div_hours() {
        assert_eq!(MegawattHours::from(25000.0) / Hours::from(4.0), Megawatts::from(6250.0));
    }

    #[test]
    fn test_div_megawatts() {
        assert_eq!(MegawattHours::from(9000.0) / Megawatts::from(3000.0), Hours::from(3.0));
    }
}
