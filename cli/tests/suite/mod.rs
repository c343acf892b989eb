mod fixture;
mod run;
mod scaffold;
mod summary;
