//! Patient list state for the patients screen.
//!
//! The backend serves the list alphabetically; the screen keeps its own copy
//! so a freshly created patient lands on top, where the user just entered
//! them, until the next fetch re-sorts it.

use crate::models::Patient;

#[derive(Debug, Default)]
pub struct PatientListView {
    patients: Vec<Patient>,
}

impl PatientListView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    /// Replace the list with a fetched result, in server order.
    pub fn set_patients(&mut self, patients: Vec<Patient>) {
        self.patients = patients;
    }

    /// Put a just-created patient at the top of the list.
    pub fn prepend(&mut self, patient: Patient) {
        self.patients.retain(|p| p.id != patient.id);
        self.patients.insert(0, patient);
    }

    /// Fold an edited patient back in place; an unknown id goes on top like
    /// a creation.
    pub fn replace(&mut self, patient: Patient) {
        match self.patients.iter().position(|p| p.id == patient.id) {
            Some(index) => self.patients[index] = patient,
            None => self.patients.insert(0, patient),
        }
    }
}
