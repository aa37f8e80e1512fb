mod autocompaction_test;
mod crash_safety_test;
mod datafile_test;
mod hooks_test;
