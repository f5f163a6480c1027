use crate::bus::I2cDriver;
use crate::config::ProbePolicy;
use crate::errors::{RegistryError, RegistryResult};
use crate::iio::IioCore;
use std::sync::Arc;

#[cfg(feature = "dmard09")]
pub mod dmard09;

/// Driver instance for a `driver = "..."` config value
#[cfg_attr(not(feature = "dmard09"), allow(unused_variables))]
pub fn create_sensor_driver(
    driver: &str,
    iio: Arc<IioCore>,
    policy: ProbePolicy,
) -> RegistryResult<Arc<dyn I2cDriver>> {
    match driver {
        #[cfg(feature = "dmard09")]
        dmard09::DMARD09_DRV_NAME => Ok(Arc::new(dmard09::Dmard09Driver::with_policy(iio, policy))),
        _ => Err(RegistryError::UnsupportedDriver {
            driver: driver.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "dmard09")]
    #[test]
    fn test_create_dmard09() {
        let driver =
            create_sensor_driver("dmard09", Arc::new(IioCore::new()), ProbePolicy::default())
                .unwrap();
        assert_eq!(driver.name(), "dmard09");
        assert_eq!(driver.id_table()[0].name, "dmard09");
    }

    #[test]
    fn test_unsupported_driver() {
        assert!(matches!(
            create_sensor_driver("bma180", Arc::new(IioCore::new()), ProbePolicy::default()),
            Err(RegistryError::UnsupportedDriver { .. })
        ));
    }
}
