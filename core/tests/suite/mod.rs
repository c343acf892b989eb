mod fixture;
mod pipeline_run;
