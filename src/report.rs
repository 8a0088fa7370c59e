use std::fmt;

use crate::merge::{RankedCell, RankedReport};

impl fmt::Display for RankedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "-------Counts of twitters in each grid cell-------")?;
        for cell in &self.cells {
            writeln!(f, "{}:{} posts", cell.id, cell.post_count)?;
        }
        writeln!(f)?;

        writeln!(
            f,
            "-------The top {} hashtags in each grid cell-------",
            self.top_n
        )?;
        for cell in &self.cells {
            writeln!(f, "{}", HashtagLine(cell))?;
        }
        Ok(())
    }
}

// `A1:((#tag,3),(#other,2))`
struct HashtagLine<'a>(&'a RankedCell);

impl fmt::Display for HashtagLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:(", self.0.id)?;
        for (i, (tag, freq)) in self.0.hashtags.iter().enumerate() {
            write!(f, "{}({},{})", if i > 0 { "," } else { "" }, tag, freq)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_counts_then_hashtags() {
        let report = RankedReport {
            cells: vec![
                RankedCell {
                    id: "C2".to_string(),
                    post_count: 12,
                    hashtags: vec![("#melbourne".to_string(), 3), ("#afl".to_string(), 2)],
                },
                RankedCell {
                    id: "A1".to_string(),
                    post_count: 0,
                    hashtags: vec![],
                },
            ],
            top_n: 5,
        };

        let expected = "\
-------Counts of twitters in each grid cell-------
C2:12 posts
A1:0 posts

-------The top 5 hashtags in each grid cell-------
C2:((#melbourne,3),(#afl,2))
A1:()
";
        assert_eq!(report.to_string(), expected);
    }
}
