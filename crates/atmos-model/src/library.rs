//! NRLMSISE-00 via a natively installed shared library.
//!
//! Binds to the C port of NRLMSISE-00 (`nrlmsise-00.c`), built as a shared
//! library exposing `gtd7d`. The library is located at run time, so the crate
//! builds on hosts without it and only a run that asks for the real model
//! needs it installed.
//!
//! # Units
//!
//! Switch 0 is turned on, so the model answers in meters and kilograms:
//! number densities in m⁻³, mass density in kg/m³. `gtd7d` folds anomalous
//! oxygen into the mass density, which is what drag calculations want.

use std::ffi::{c_double, c_int};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Datelike, Timelike};
use libloading::Library;
use tracing::{debug, info};

use atmos_common::{
    AtmosphericSample, BackendError, BackendUnavailableError, SpeciesDensities,
};

use crate::{AtmosphereBackend, PointQuery};

/// Environment variable naming the library to load when no path is given.
pub const DEFAULT_LIBRARY_ENV: &str = "NRLMSISE_LIBRARY";

const BACKEND_NAME: &str = "nrlmsise00";
const ENTRY_POINT: &[u8] = b"gtd7d\0";

#[repr(C)]
struct NrlmsiseFlags {
    switches: [c_int; 24],
    sw: [c_double; 24],
    swc: [c_double; 24],
}

impl NrlmsiseFlags {
    /// All variations on, output in meters/kilograms.
    fn metric() -> Self {
        Self {
            switches: [1; 24],
            sw: [0.0; 24],
            swc: [0.0; 24],
        }
    }
}

#[repr(C)]
struct ApArray {
    a: [c_double; 7],
}

#[repr(C)]
struct NrlmsiseInput {
    year: c_int,
    doy: c_int,
    sec: c_double,
    alt: c_double,
    g_lat: c_double,
    g_long: c_double,
    lst: c_double,
    f107a: c_double,
    f107: c_double,
    ap: c_double,
    ap_a: *mut ApArray,
}

#[repr(C)]
struct NrlmsiseOutput {
    d: [c_double; 9],
    t: [c_double; 2],
}

type Gtd7Fn = unsafe extern "C" fn(*mut NrlmsiseInput, *mut NrlmsiseFlags, *mut NrlmsiseOutput);

/// NRLMSISE-00 backend backed by a dynamically loaded library.
pub struct LibraryBackend {
    entry: Gtd7Fn,
    /// The C model keeps static state between calls
    lock: Mutex<()>,
    // Keeps `entry` valid; must not be dropped before it.
    _library: Library,
}

impl LibraryBackend {
    /// Load the model from an explicit library path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BackendUnavailableError> {
        let path = path.as_ref().to_path_buf();

        // SAFETY: loading a library runs its initialisers. The path names an
        // NRLMSISE-00 build, which has none beyond the C runtime's.
        let library = unsafe { Library::new(&path) }.map_err(|e| {
            BackendUnavailableError::new(
                BACKEND_NAME,
                format!("cannot load {}: {}", path.display(), e),
            )
        })?;

        // SAFETY: `gtd7d` in nrlmsise-00.c has exactly the `Gtd7Fn` signature.
        // The copied function pointer stays valid while `library` is held.
        let entry: Gtd7Fn = unsafe {
            let symbol = library.get::<Gtd7Fn>(ENTRY_POINT).map_err(|e| {
                BackendUnavailableError::new(
                    BACKEND_NAME,
                    format!("{} has no gtd7d entry point: {}", path.display(), e),
                )
            })?;
            *symbol
        };

        info!(path = %path.display(), "Loaded NRLMSISE-00 library");

        Ok(Self {
            entry,
            lock: Mutex::new(()),
            _library: library,
        })
    }

    /// Load the model from `$NRLMSISE_LIBRARY`, or the platform's default
    /// name for `nrlmsise00` (e.g. `libnrlmsise00.so`) on the loader path.
    pub fn from_env() -> Result<Self, BackendUnavailableError> {
        Self::open(default_library_path())
    }
}

fn default_library_path() -> PathBuf {
    std::env::var_os(DEFAULT_LIBRARY_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(libloading::library_filename("nrlmsise00")))
}

fn build_input(query: &PointQuery, ap_array: &mut ApArray) -> NrlmsiseInput {
    let ut_seconds = f64::from(query.time.num_seconds_from_midnight())
        + f64::from(query.time.nanosecond()) * 1e-9;
    let longitude = query.longitude_deg.rem_euclid(360.0);
    let local_solar_time = (ut_seconds / 3600.0 + longitude / 15.0).rem_euclid(24.0);

    NrlmsiseInput {
        year: query.time.year(),
        doy: query.time.ordinal() as c_int,
        sec: ut_seconds,
        alt: query.altitude_m / 1000.0,
        g_lat: query.latitude_deg,
        g_long: longitude,
        lst: local_solar_time,
        // A single flux index is configured; it serves as both the daily and
        // the 81-day average value.
        f107a: query.solar_flux_index,
        f107: query.solar_flux_index,
        ap: query.geomagnetic_index,
        ap_a: ap_array,
    }
}

impl AtmosphereBackend for LibraryBackend {
    fn query(&self, query: &PointQuery) -> Result<AtmosphericSample, BackendError> {
        let mut ap_array = ApArray {
            a: [query.geomagnetic_index; 7],
        };
        let mut input = build_input(query, &mut ap_array);
        let mut flags = NrlmsiseFlags::metric();
        let mut output = NrlmsiseOutput {
            d: [0.0; 9],
            t: [0.0; 2],
        };

        {
            let _guard = self
                .lock
                .lock()
                .map_err(|_| BackendError::Evaluation("model lock poisoned".to_string()))?;

            // SAFETY: all three pointers reference live, properly laid out
            // structs for the duration of the call, and the lock prevents
            // concurrent entry into the model's static state.
            unsafe { (self.entry)(&mut input, &mut flags, &mut output) };
        }

        debug!(
            alt_km = input.alt,
            doy = input.doy,
            rho = output.d[5],
            t_alt = output.t[1],
            "NRLMSISE-00 evaluated"
        );

        Ok(AtmosphericSample {
            time: query.time,
            latitude_deg: query.latitude_deg,
            longitude_deg: query.longitude_deg,
            altitude_m: query.altitude_m,
            densities: SpeciesDensities {
                he: output.d[0],
                o: output.d[1],
                n2: output.d[2],
                o2: output.d[3],
                ar: output.d[4],
                h: output.d[6],
                n: output.d[7],
            },
            mass_density: output.d[5],
            exospheric_temperature: output.t[0],
            local_temperature: output.t[1],
        })
    }

    fn name(&self) -> &'static str {
        BACKEND_NAME
    }
}
