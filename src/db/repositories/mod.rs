mod medication_logs;
mod medications;
