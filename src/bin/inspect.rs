use std::{error::Error, env, path::Path};
use context_extractor::read_records;


// checks on extracted contexts: prints how many records an output file holds,
// and the first few of them with their l2 norm.
// treated as binary executable so it can be ran independantly from main
// example: ... Output/1234.vectors 50 10

fn main() -> Result<(), Box<dyn Error>> {

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 || args.len() > 4 {
        return Err("arguments should be a path to a .vectors file, the vector dimension and optionally a number of rows".into());
    }

    let dim: usize = args[2].parse().map_err(|_| format!("dimension {} is not a number", &args[2]))?;
    let rows: usize = match args.get(3) {
        Some(rows) => rows.parse().map_err(|_| format!("rows {} is not a number", rows))?,
        None => 5
    };

    let records = read_records(Path::new(&args[1]), dim)?;
    println!("{} holds {} contexts of dimension {}", &args[1], records.nrows(), dim);

    for (i, record) in records.rows().into_iter().take(rows).enumerate() {
        let norm = record.dot(&record).sqrt();
        println!("{} : norm {} = {}", i, norm, record);
    }

    Ok(())

}
